use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the settings file, looked up next to the executable.
pub const SETTINGS_FILE: &str = "modlhandler.json";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// URI scheme this program claims and dispatches.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Program receiving links when no handler is registered for a game.
    /// Relative paths resolve against the application directory.
    #[serde(default = "default_fallback_executable")]
    pub fallback_executable: String,
    /// Argument placed before the forwarded link.
    #[serde(default = "default_download_argument")]
    pub download_argument: String,
    /// Directory below the local data dir shared with the mod manager.
    #[serde(default = "default_data_dir_name")]
    pub data_dir_name: String,
    /// When enabled the logger runs at debug level.
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_scheme() -> String {
    "modl".into()
}

fn default_fallback_executable() -> String {
    "ModOrganizer.exe".into()
}

fn default_download_argument() -> String {
    "download".into()
}

fn default_data_dir_name() -> String {
    "ModOrganizer".into()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            fallback_executable: default_fallback_executable(),
            download_argument: default_download_argument(),
            data_dir_name: default_data_dir_name(),
            debug_logging: false,
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Prefix every link for this scheme starts with.
    pub fn link_prefix(&self) -> String {
        format!("{}://", self.scheme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join(SETTINGS_FILE)).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.link_prefix(), "modl://");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{ "scheme": "nxm", "debug_logging": true }"#).unwrap();
        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.scheme, "nxm");
        assert!(settings.debug_logging);
        assert_eq!(settings.download_argument, "download");
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let settings = Settings {
            fallback_executable: "C:/MO2/ModOrganizer.exe".into(),
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }
}
