//! Interactive confirmation on the terminal

use ss_manager_core::Prompt;
use std::io::{self, BufRead, Write};

/// Asks on stderr and reads the answer from stdin; `assume_yes` skips asking
pub struct TerminalPrompt {
    pub assume_yes: bool,
}

impl Prompt for TerminalPrompt {
    fn confirm(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        let mut stderr = io::stderr();
        if write!(stderr, "{} [y/N] ", question).and_then(|_| stderr.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}
