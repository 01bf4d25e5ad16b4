//! Resolver prompts answered on the terminal.
//!
//! Prompts go to stderr so stdout only ever carries command results.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::Command;

use dmlc_resolver::Prompter;

pub struct TerminalPrompter {
    config_path: PathBuf,
}

impl TerminalPrompter {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }
}

impl Prompter for TerminalPrompter {
    fn choose(&self, choices: &[&str]) -> Option<usize> {
        eprintln!("dm-langserver auto-update:");
        for (number, choice) in choices.iter().enumerate() {
            eprintln!("  {}) {choice}", number + 1);
        }
        ask(&format!(
            "Choose 1-{}, or press Enter to dismiss: ",
            choices.len()
        ))
        .and_then(|answer| parse_choice(&answer, choices.len()))
    }

    fn confirm_edit(&self, message: &str) -> bool {
        eprintln!("dm-langserver: {message}");
        ask("Edit the langserver path now? [y/N] ").is_some_and(|answer| parse_yes(&answer))
    }

    fn open_settings(&self) {
        let path = self.config_path.display();
        let Some(editor) = env::var("VISUAL")
            .or_else(|_| env::var("EDITOR"))
            .ok()
            .filter(|editor| !editor.trim().is_empty())
        else {
            eprintln!("Set [dreammaker] langserver_path in {path}; waiting for the change.");
            return;
        };

        let mut words = editor.split_whitespace();
        let Some(program) = words.next() else {
            return;
        };
        match Command::new(program)
            .args(words)
            .arg(&self.config_path)
            .status()
        {
            Ok(status) => tracing::debug!(%status, editor = %editor, "settings editor closed"),
            Err(e) => {
                tracing::warn!(editor = %editor, "failed to open settings editor: {e}");
                eprintln!("Set [dreammaker] langserver_path in {path}; waiting for the change.");
            }
        }
    }
}

/// Prints `question` and reads one line. `None` on EOF or a read error.
fn ask(question: &str) -> Option<String> {
    eprint!("{question}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim().to_string()),
        Err(e) => {
            tracing::warn!("failed to read answer: {e}");
            None
        }
    }
}

/// 1-based answer to a 0-based index.
fn parse_choice(answer: &str, count: usize) -> Option<usize> {
    let number: usize = answer.trim().parse().ok()?;
    number.checked_sub(1).filter(|&index| index < count)
}

fn parse_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
