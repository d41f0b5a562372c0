//! Access to the operating system's URI scheme associations.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read/write access to whichever command line currently owns a URI scheme.
pub trait ProtocolRegistry {
    /// Current command line template for `scheme`, if one is registered.
    fn read(&self, scheme: &str) -> Option<String>;
    /// Claim `scheme` with `command`.
    fn write(&mut self, scheme: &str, command: &str) -> anyhow::Result<()>;
}

/// Build the command line template used when claiming a scheme for `exe`.
pub fn proxy_command(exe: &Path) -> String {
    format!("\"{}\" \"%1\"", native_separators(&exe.to_string_lossy()))
}

fn native_separators(path: &str) -> String {
    if cfg!(windows) {
        path.replace('/', "\\")
    } else {
        path.to_string()
    }
}

/// Make `exe` the owner of `scheme`.
pub fn register_proxy(
    protocols: &mut dyn ProtocolRegistry,
    scheme: &str,
    exe: &Path,
) -> anyhow::Result<()> {
    let command = proxy_command(exe);
    tracing::info!("registering {command} as {scheme}:// handler");
    protocols.write(scheme, &command)
}

/// In-process registry, useful for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryProtocolRegistry {
    commands: BTreeMap<String, String>,
}

impl MemoryProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(scheme: &str, command: &str) -> Self {
        let mut reg = Self::default();
        reg.commands.insert(scheme.to_lowercase(), command.to_string());
        reg
    }
}

impl ProtocolRegistry for MemoryProtocolRegistry {
    fn read(&self, scheme: &str) -> Option<String> {
        self.commands.get(&scheme.to_lowercase()).cloned()
    }

    fn write(&mut self, scheme: &str, command: &str) -> anyhow::Result<()> {
        self.commands
            .insert(scheme.to_lowercase(), command.to_string());
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ProtocolEntry {
    pub scheme: String,
    pub description: String,
    pub command: String,
}

/// Scheme associations kept in a JSON file, for platforms without a
/// registry.
pub struct FileProtocolRegistry {
    path: PathBuf,
}

impl FileProtocolRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry file under the user's configuration directory.
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("modl_handler")
            .join("protocols.json")
    }

    fn load(&self) -> Vec<ProtocolEntry> {
        let content = std::fs::read_to_string(&self.path).unwrap_or_default();
        if content.trim().is_empty() {
            return Vec::new();
        }
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("ignoring corrupt protocol file {}: {e}", self.path.display());
            Vec::new()
        })
    }
}

impl ProtocolRegistry for FileProtocolRegistry {
    fn read(&self, scheme: &str) -> Option<String> {
        self.load()
            .into_iter()
            .find(|e| e.scheme.eq_ignore_ascii_case(scheme))
            .map(|e| e.command)
    }

    fn write(&mut self, scheme: &str, command: &str) -> anyhow::Result<()> {
        let mut list = self.load();
        list.retain(|e| !e.scheme.eq_ignore_ascii_case(scheme));
        list.push(ProtocolEntry {
            scheme: scheme.to_lowercase(),
            description: protocol_description(scheme),
            command: command.to_string(),
        });
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&list)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

fn protocol_description(scheme: &str) -> String {
    format!("URL:{} Protocol", scheme.to_uppercase())
}

#[cfg(target_os = "windows")]
pub use windows_registry::WindowsProtocolRegistry;

#[cfg(target_os = "windows")]
mod windows_registry {
    use super::{protocol_description, ProtocolRegistry};
    use std::ffi::OsStr;
    use std::os::windows::ffi::OsStrExt;
    use windows::core::PCWSTR;
    use windows::Win32::Foundation::{ERROR_MORE_DATA, ERROR_SUCCESS};
    use windows::Win32::System::Registry::{
        RegGetValueW, RegSetKeyValueW, HKEY_CLASSES_ROOT, HKEY_CURRENT_USER, REG_SZ,
        RRF_RT_REG_SZ,
    };

    fn wide(s: &str) -> Vec<u16> {
        OsStr::new(s).encode_wide().chain(Some(0)).collect()
    }

    /// Scheme associations under `Software\Classes` in the Windows registry.
    #[derive(Default)]
    pub struct WindowsProtocolRegistry;

    impl WindowsProtocolRegistry {
        fn set_string(subkey: &str, name: &str, value: &str) -> anyhow::Result<()> {
            let subkey = wide(subkey);
            let name = wide(name);
            let data = wide(value);
            let err = unsafe {
                RegSetKeyValueW(
                    HKEY_CURRENT_USER,
                    PCWSTR(subkey.as_ptr()),
                    PCWSTR(name.as_ptr()),
                    REG_SZ.0,
                    Some(data.as_ptr() as *const _),
                    (data.len() * std::mem::size_of::<u16>()) as u32,
                )
            };
            if err != ERROR_SUCCESS {
                anyhow::bail!("RegSetKeyValueW failed with code {}", err.0);
            }
            Ok(())
        }
    }

    impl ProtocolRegistry for WindowsProtocolRegistry {
        fn read(&self, scheme: &str) -> Option<String> {
            let subkey = wide(&format!("{scheme}\\shell\\open\\command"));
            let query = |data: Option<*mut std::ffi::c_void>, size: &mut u32| unsafe {
                RegGetValueW(
                    HKEY_CLASSES_ROOT,
                    PCWSTR(subkey.as_ptr()),
                    PCWSTR::null(),
                    RRF_RT_REG_SZ,
                    None,
                    data,
                    Some(size as *mut u32),
                )
            };

            // The value may grow between the size query and the read.
            for _ in 0..3 {
                let mut size = 0u32;
                if query(None, &mut size) != ERROR_SUCCESS {
                    return None;
                }
                let mut buf = vec![0u16; (size as usize).div_ceil(2) + 1];
                let mut size = (buf.len() * std::mem::size_of::<u16>()) as u32;
                match query(Some(buf.as_mut_ptr() as *mut _), &mut size) {
                    ERROR_SUCCESS => {
                        let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
                        return Some(String::from_utf16_lossy(&buf[..len]));
                    }
                    ERROR_MORE_DATA => continue,
                    _ => return None,
                }
            }
            None
        }

        fn write(&mut self, scheme: &str, command: &str) -> anyhow::Result<()> {
            let root = format!("Software\\Classes\\{scheme}");
            Self::set_string(&root, "", &protocol_description(scheme))?;
            Self::set_string(&root, "URL Protocol", "")?;
            Self::set_string(&format!("{root}\\shell\\open\\command"), "", command)?;
            Ok(())
        }
    }

}

/// The registry backend for the current platform.
pub fn system_registry() -> Box<dyn ProtocolRegistry> {
    #[cfg(target_os = "windows")]
    {
        Box::new(WindowsProtocolRegistry)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(FileProtocolRegistry::new(FileProtocolRegistry::default_path()))
    }
}
