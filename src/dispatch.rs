use crate::handler_storage::HandlerStorage;
use crate::launcher::ProcessLauncher;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use url::Url;

static FULLY_QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^".*"$"#).expect("valid quote regex"));

/// Query parameter carrying the forwarded link.
pub const PAYLOAD_PARAM: &str = "url";

/// Extract the executable path from a registered command line template such
/// as `"C:\path\app.exe" "%1"`.
///
/// The heuristic assumes the path ends with an ASCII letter and that the
/// arguments follow it directly: everything after the last letter is cut,
/// then leading quotes are stripped. Inputs without any letter are only
/// unquoted. Paths ending in a digit or containing letters in their
/// arguments come out wrong; callers treat this as a known limitation.
pub fn strip_call(command: &str) -> String {
    let mut result = match command.rfind(|c: char| c.is_ascii_alphabetic()) {
        Some(idx) => &command[..=idx],
        None => command,
    };
    while let Some(rest) = result.strip_prefix('"') {
        result = rest;
    }
    result.to_string()
}

/// Wrap `s` in double quotes unless the whole string already is.
pub fn quote(s: &str) -> String {
    if FULLY_QUOTED.is_match(s) {
        s.to_string()
    } else {
        format!("\"{s}\"")
    }
}

/// A parsed `scheme://game/...?url=<payload>` link.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModLink {
    pub game: String,
    pub payload: String,
}

/// Split a scheme link into the game it targets and the decoded payload.
///
/// Unparseable input produces empty fields rather than an error.
pub fn parse_link(raw: &str) -> ModLink {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("failed to parse link {raw}: {e}");
            return ModLink::default();
        }
    };
    let game = url.host_str().unwrap_or_default().to_string();
    let payload = url
        .query()
        .and_then(|q| query_value(q, PAYLOAD_PARAM))
        .unwrap_or_default();
    ModLink { game, payload }
}

fn query_value(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then(|| String::from_utf8_lossy(&urlencoding::decode_binary(v.as_bytes())).into_owned())
    })
}

/// Find the handler registered for `game`.
pub fn resolve_executable(game: &str, storage: &HandlerStorage) -> Option<String> {
    storage.get_handler(game)
}

/// Launch `executable` with `arguments` followed by the quoted `link`.
///
/// Launch failures are logged; the return value only reports whether the
/// launcher accepted the request.
pub fn handle_link(
    launcher: &dyn ProcessLauncher,
    executable: &str,
    arguments: &str,
    link: &str,
) -> bool {
    let quoted_executable = quote(executable);
    let quoted_link = quote(link);
    let parameters = format!("{arguments} {quoted_link}");
    let working_dir = working_dir_of(executable);
    tracing::debug!("launching {quoted_executable} {parameters}");
    match launcher.launch(&quoted_executable, &parameters, &working_dir) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("failed to launch {quoted_executable}: {e}");
            false
        }
    }
}

fn working_dir_of(executable: &str) -> std::path::PathBuf {
    let unquoted = executable.trim_matches('"');
    let dir = Path::new(unquoted)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// What [`dispatch_link`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub link: ModLink,
    pub executable: String,
    pub used_fallback: bool,
    pub launched: bool,
}

/// Resolve the handler for `raw_link` and forward its payload.
///
/// The registered handler for the link's game wins; without one (or without
/// a loaded storage) `fallback` receives the link.
pub fn dispatch_link(
    storage: Option<&HandlerStorage>,
    launcher: &dyn ProcessLauncher,
    raw_link: &str,
    arguments: &str,
    fallback: &Path,
) -> DispatchOutcome {
    let link = parse_link(raw_link);
    let found = storage
        .and_then(|s| resolve_executable(&link.game, s))
        .filter(|exe| !exe.is_empty());
    let used_fallback = found.is_none();
    let executable = found.unwrap_or_else(|| fallback.to_string_lossy().into_owned());
    if used_fallback {
        tracing::info!("no handler for game '{}', using {executable}", link.game);
    }
    let launched = handle_link(launcher, &executable, arguments, &link.payload);
    DispatchOutcome {
        link,
        executable,
        used_fallback,
        launched,
    }
}
