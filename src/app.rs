use crate::cli::{parse_invocation, HandlerRegistration, Invocation};
use crate::dispatch::{dispatch_link, DispatchOutcome};
use crate::handler_storage::{HandlerStorage, HANDLER_STORE_FILE};
use crate::launcher::ProcessLauncher;
use crate::location::{default_base_dir, locate_storage};
use crate::prompt::Prompt;
use crate::protocol::{register_proxy, ProtocolRegistry};
use crate::settings::Settings;
use crate::store::IniStore;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "modlhandler";

/// Everything a single invocation talks to.
pub struct AppContext<'a> {
    pub settings: &'a Settings,
    pub protocols: &'a mut dyn ProtocolRegistry,
    pub launcher: &'a dyn ProcessLauncher,
    pub prompt: &'a dyn Prompt,
    /// Path of the running executable, written into the scheme registration.
    pub exe_path: PathBuf,
    pub app_dir: PathBuf,
    pub global_dir: Option<PathBuf>,
}

impl AppContext<'_> {
    /// File name identifying copies of this program in scheme registrations.
    pub fn holder_name(&self) -> String {
        self.exe_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{APP_NAME}.exe"))
    }

    fn scheme(&self) -> &str {
        &self.settings.scheme
    }

    /// Load the handler list owned by the registered scheme handler, if any.
    pub fn load_storage(&self) -> Option<HandlerStorage> {
        let command = self.protocols.read(self.scheme());
        let dir = locate_storage(
            self.global_dir.as_deref(),
            command.as_deref(),
            &self.holder_name(),
        )?;
        Some(self.open_storage(&dir))
    }

    fn open_storage(&self, dir: &Path) -> HandlerStorage {
        let store = IniStore::open(dir.join(HANDLER_STORE_FILE));
        tracing::debug!("using handler store {}", store.path().display());
        HandlerStorage::load(
            Box::new(store),
            &*self.protocols,
            self.scheme(),
            &self.holder_name(),
        )
    }

    /// Program receiving links nobody registered for.
    pub fn fallback_executable(&self) -> PathBuf {
        let fallback = Path::new(&self.settings.fallback_executable);
        if fallback.is_absolute() {
            fallback.to_path_buf()
        } else {
            self.app_dir.join(fallback)
        }
    }
}

/// Run one invocation and return the process exit code.
pub fn run<S: AsRef<str>>(args: &[S], ctx: &mut AppContext<'_>) -> anyhow::Result<u8> {
    let joined: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
    tracing::info!("\"{}\"", joined.join("\" \""));

    match parse_invocation(args, &ctx.settings.link_prefix()) {
        Invocation::Interactive => {
            let question = format!(
                "Associate {APP_NAME} with {} links?",
                ctx.settings.link_prefix()
            );
            if ctx.prompt.ask_yes_no("Create association", &question) {
                register_proxy(&mut *ctx.protocols, &ctx.settings.scheme, &ctx.exe_path)?;
            }
            Ok(0)
        }
        Invocation::Register { force, handler } => {
            if let Some(handler) = handler {
                register_handler(ctx, &handler, force)?;
            }
            register_proxy(&mut *ctx.protocols, &ctx.settings.scheme, &ctx.exe_path)?;
            Ok(0)
        }
        Invocation::Dispatch(link) => {
            let outcome = dispatch(ctx, &link);
            tracing::debug!("dispatch finished: {outcome:?}");
            Ok(0)
        }
        Invocation::Invalid => {
            ctx.prompt
                .warn("Invalid Arguments", "Invalid number of parameters");
            Ok(1)
        }
    }
}

fn register_handler(
    ctx: &AppContext<'_>,
    handler: &HandlerRegistration,
    force: bool,
) -> anyhow::Result<()> {
    let mut storage = match ctx.load_storage() {
        Some(storage) => storage,
        None => {
            let dir = default_base_dir(ctx.global_dir.as_deref(), &ctx.app_dir);
            ctx.open_storage(&dir)
        }
    };
    match &handler.games {
        Some(games) => storage.register_handler(&games[..], &handler.executable, true, force),
        None if force => {
            let games = crate::games::known_game_ids();
            storage.register_handler(&games[..], &handler.executable, true, true);
        }
        None => storage.register_all(&handler.executable, true),
    }
    tracing::info!("registered {} as link handler", handler.executable);
    storage.save()
}

fn dispatch(ctx: &AppContext<'_>, link: &str) -> DispatchOutcome {
    let mut storage = ctx.load_storage();
    let outcome = dispatch_link(
        storage.as_ref(),
        ctx.launcher,
        link,
        &ctx.settings.download_argument,
        &ctx.fallback_executable(),
    );
    if let Some(storage) = storage.as_mut() {
        if let Err(e) = storage.save() {
            tracing::warn!("failed to save handler store: {e}");
        }
    }
    outcome
}
