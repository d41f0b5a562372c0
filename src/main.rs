#![cfg_attr(all(target_os = "windows", not(debug_assertions)), windows_subsystem = "windows")]

use modl_handler::app::{self, AppContext, APP_NAME};
use modl_handler::cli::lossy_args;
use modl_handler::launcher::ShellLauncher;
use modl_handler::location::{app_dir, default_base_dir, global_dir};
use modl_handler::logging;
use modl_handler::prompt::system_prompt;
use modl_handler::protocol::system_registry;
use modl_handler::settings::{Settings, SETTINGS_FILE};
use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let app_dir = app_dir();
    let prompt = system_prompt();

    let settings_path = app_dir.join(SETTINGS_FILE);
    let settings = match Settings::load(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            prompt.critical(APP_NAME, &format!("Invalid settings file:\n{e}"));
            return Err(e);
        }
    };

    let global_dir = global_dir(&settings.data_dir_name);
    let log_path = default_base_dir(global_dir.as_deref(), &app_dir).join(format!("{APP_NAME}.log"));
    let log_guard = logging::init(settings.debug_logging, Some(log_path));
    if !settings_path.exists() {
        if let Err(e) = settings.save(&settings_path) {
            tracing::warn!("failed to write default settings: {e}");
        }
    }

    let mut protocols = system_registry();
    let launcher = ShellLauncher;
    let exe_path = std::env::current_exe().unwrap_or_else(|_| app_dir.join(format!("{APP_NAME}.exe")));
    let mut ctx = AppContext {
        settings: &settings,
        protocols: protocols.as_mut(),
        launcher: &launcher,
        prompt: prompt.as_ref(),
        exe_path,
        app_dir,
        global_dir,
    };

    let args = lossy_args(std::env::args_os().skip(1));
    let result = app::run(&args, &mut ctx);
    if let Err(e) = &result {
        tracing::error!("uncaught error: {e:#}");
        prompt.critical(APP_NAME, &format!("Uncaught exception:\n{e:#}"));
    }
    logging::deinit(log_guard);
    result.map(ExitCode::from)
}
