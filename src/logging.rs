use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Log files above this size are truncated before new output is appended.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Keeps the file writer alive. Pass it to [`deinit`] (or drop it) to flush.
#[must_use]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Initialise logging. Without `debug` the level is fixed at `info`; with it
/// `RUST_LOG` may override the default `debug` level.
///
/// When `log_file` is given, output goes to that file instead of stderr.
pub fn init(debug: bool, log_file: Option<PathBuf>) -> LogGuard {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let Some(path) = log_file else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        return LogGuard { _file: None };
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "modlhandler.log".into());
    let _ = std::fs::create_dir_all(&dir);
    cap_log_size(&path);

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    LogGuard { _file: Some(guard) }
}

/// Flush and close the log file.
pub fn deinit(guard: LogGuard) {
    drop(guard);
}

fn cap_log_size(path: &Path) {
    let too_big = std::fs::metadata(path)
        .map(|m| m.len() > MAX_LOG_SIZE)
        .unwrap_or(false);
    if too_big {
        if let Err(e) = std::fs::File::create(path) {
            eprintln!("failed to truncate log {}: {e}", path.display());
        }
    }
}
