/// A handler to add while claiming the scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRegistration {
    /// Games to register for; `None` means every known game.
    pub games: Option<Vec<String>>,
    pub executable: String,
}

/// What the process was asked to do.
///
/// Accepted shapes:
/// * no arguments: offer to claim the scheme interactively
/// * `reg|forcereg [games] [executable]`: claim the scheme, optionally
///   registering a handler first
/// * `<scheme>://...`: forward the link to its handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Interactive,
    Register {
        force: bool,
        handler: Option<HandlerRegistration>,
    },
    Dispatch(String),
    Invalid,
}

/// Parse the process arguments, without the program name.
pub fn parse_invocation<S: AsRef<str>>(args: &[S], link_prefix: &str) -> Invocation {
    let Some(first) = args.first().map(|s| s.as_ref()) else {
        return Invocation::Interactive;
    };
    let rest: Vec<&str> = args[1..].iter().map(|s| s.as_ref()).collect();

    if first == "reg" || first == "forcereg" {
        let force = first == "forcereg";
        let handler = match rest.as_slice() {
            [] => None,
            [executable] => Some(HandlerRegistration {
                games: None,
                executable: executable.to_string(),
            }),
            [games, executable] => Some(HandlerRegistration {
                games: Some(split_games(games)),
                executable: executable.to_string(),
            }),
            _ => return Invocation::Invalid,
        };
        return Invocation::Register { force, handler };
    }

    let is_link = first
        .get(..link_prefix.len())
        .map(|p| p.eq_ignore_ascii_case(link_prefix))
        .unwrap_or(false);
    if is_link {
        return Invocation::Dispatch(first.to_string());
    }
    Invocation::Invalid
}

fn split_games(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert raw process arguments, replacing invalid UTF-8 instead of failing.
pub fn lossy_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<std::ffi::OsStr>,
{
    args.into_iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect()
}
