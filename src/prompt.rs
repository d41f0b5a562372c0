/// User-facing questions and notifications.
pub trait Prompt {
    fn ask_yes_no(&self, title: &str, text: &str) -> bool;
    fn warn(&self, title: &str, text: &str);
    fn critical(&self, title: &str, text: &str);
}

/// Native message boxes.
#[cfg(target_os = "windows")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogPrompt;

#[cfg(target_os = "windows")]
impl DialogPrompt {
    fn show(level: rfd::MessageLevel, title: &str, text: &str) {
        let _ = rfd::MessageDialog::new()
            .set_level(level)
            .set_title(title)
            .set_description(text)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }
}

#[cfg(target_os = "windows")]
impl Prompt for DialogPrompt {
    fn ask_yes_no(&self, title: &str, text: &str) -> bool {
        let result = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Info)
            .set_title(title)
            .set_description(text)
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        matches!(result, rfd::MessageDialogResult::Yes)
    }

    fn warn(&self, title: &str, text: &str) {
        Self::show(rfd::MessageLevel::Warning, title, text);
    }

    fn critical(&self, title: &str, text: &str) {
        Self::show(rfd::MessageLevel::Error, title, text);
    }
}

/// Terminal prompt for platforms without native dialogs.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn ask_yes_no(&self, title: &str, text: &str) -> bool {
        use std::io::Write;
        print!("{title}: {text} [y/N] ");
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }

    fn warn(&self, title: &str, text: &str) {
        eprintln!("{title}: {text}");
    }

    fn critical(&self, title: &str, text: &str) {
        eprintln!("{title}: {text}");
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// The prompt used by the binary on this platform.
pub fn system_prompt() -> Box<dyn Prompt> {
    #[cfg(target_os = "windows")]
    {
        Box::new(DialogPrompt)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(ConsolePrompt)
    }
}

#[cfg(test)]
mod tests {
    use super::is_yes;

    #[test]
    fn yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }
}
