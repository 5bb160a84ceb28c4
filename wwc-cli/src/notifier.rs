//! Terminal acknowledgment dialog for remote failures.

use std::io::IsTerminal;

use wwc_core::{Notifier, RemoteError};

/// Prints each alert to stderr. In interactive mode on a terminal, waits
/// for the user to acknowledge it before continuing.
#[derive(Debug)]
pub struct ConsoleNotifier {
    interactive: bool,
}

impl ConsoleNotifier {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Notifier for ConsoleNotifier {
    fn alert(&self, title: &str, error: &RemoteError) {
        tracing::info!(title, error = %error, "Alert shown");
        eprintln!("\n  \u{2717} {title}\n    {}", error.user_message());
        if self.interactive && std::io::stdin().is_terminal() {
            let _ = dialoguer::Input::<String>::new()
                .with_prompt("  Press Enter to continue")
                .allow_empty(true)
                .interact_text();
        }
    }
}
