use std::path::Path;

/// Spawns an external program and forgets about it.
pub trait ProcessLauncher {
    /// Start `executable` with the pre-quoted `arguments` string inside
    /// `working_dir`.
    fn launch(&self, executable: &str, arguments: &str, working_dir: &Path) -> anyhow::Result<()>;
}

/// Launcher backed by the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(target_os = "windows")]
impl ProcessLauncher for ShellLauncher {
    fn launch(&self, executable: &str, arguments: &str, working_dir: &Path) -> anyhow::Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows::core::PCWSTR;
        use windows::Win32::Foundation::HWND;
        use windows::Win32::UI::Shell::ShellExecuteW;
        use windows::Win32::UI::WindowsAndMessaging::SW_SHOWNORMAL;

        fn wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(Some(0)).collect()
        }

        let operation = wide(OsStr::new("open"));
        let file = wide(OsStr::new(unquote(executable)));
        let params = wide(OsStr::new(arguments));
        let dir = wide(working_dir.as_os_str());
        let result = unsafe {
            ShellExecuteW(
                HWND::default(),
                PCWSTR(operation.as_ptr()),
                PCWSTR(file.as_ptr()),
                PCWSTR(params.as_ptr()),
                PCWSTR(dir.as_ptr()),
                SW_SHOWNORMAL,
            )
        };
        // values up to 32 are error codes
        if result.0 as isize <= 32 {
            anyhow::bail!("ShellExecuteW failed for {executable} with code {}", result.0 as isize);
        }
        Ok(())
    }
}

#[cfg(not(target_os = "windows"))]
impl ProcessLauncher for ShellLauncher {
    fn launch(&self, executable: &str, arguments: &str, working_dir: &Path) -> anyhow::Result<()> {
        let mut command = std::process::Command::new(unquote(executable));
        let arguments = arguments.trim();
        if !arguments.is_empty() {
            if let Some(list) = shlex::split(arguments) {
                command.args(list);
            } else {
                command.args(arguments.split_whitespace());
            }
        }
        if working_dir.is_dir() {
            command.current_dir(working_dir);
        }
        command.spawn().map(|_| ()).map_err(|e| e.into())
    }
}
