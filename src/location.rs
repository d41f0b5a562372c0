//! Decide which installation's handler list is authoritative.
//!
//! Several copies of the handler may exist (an installed one sharing the
//! per-user data directory and portable ones). The copy that owns the URI
//! scheme decides where the list lives, even when another copy is running.

use crate::dispatch::strip_call;
use crate::handler_storage::HANDLER_STORE_FILE;
use std::path::{Path, PathBuf};

/// Per-user data directory shared with the mod manager, e.g.
/// `%LOCALAPPDATA%\ModOrganizer`.
pub fn global_dir(data_dir_name: &str) -> Option<PathBuf> {
    dirs_next::data_local_dir().map(|d| d.join(data_dir_name))
}

/// Directory containing the running executable.
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Where logs and freshly created stores go: the global dir if it exists,
/// otherwise the application directory.
pub fn default_base_dir(global: Option<&Path>, app: &Path) -> PathBuf {
    match global {
        Some(dir) if dir.is_dir() => dir.to_path_buf(),
        _ => app.to_path_buf(),
    }
}

/// Locate the directory holding the store of the registered handler.
///
/// `scheme_command` is the command line currently registered for the
/// scheme. Only a registered copy of this program (`holder_name`) that
/// exists on disk qualifies. Its store is looked up first in `global` and
/// then next to the registered executable.
pub fn locate_storage(
    global: Option<&Path>,
    scheme_command: Option<&str>,
    holder_name: &str,
) -> Option<PathBuf> {
    let handler_path = strip_call(scheme_command?);
    let is_holder = handler_path
        .to_lowercase()
        .ends_with(&holder_name.to_lowercase());
    if !is_holder || !Path::new(&handler_path).is_file() {
        tracing::debug!("scheme owner '{handler_path}' is not a usable {holder_name}");
        return None;
    }

    if let Some(global) = global {
        if global.join(HANDLER_STORE_FILE).is_file() {
            return Some(global.to_path_buf());
        }
    }

    let handler_dir = Path::new(&handler_path).parent()?;
    if handler_dir.join(HANDLER_STORE_FILE).is_file() {
        return Some(handler_dir.to_path_buf());
    }
    None
}
