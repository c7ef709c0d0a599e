//! Chat REPL built-in commands

use crate::types::ModelChoice;

/// One line of REPL input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: a question for the assistant
    Ask(String),
    Help,
    Reset,
    /// Switch backend; `None` shows the current one
    Model { choice: Option<ModelChoice> },
    Prompts,
    /// Ask the saved prompt at this 1-based position
    Use { index: usize },
    History,
    Quit,
    Empty,
    Invalid { message: String },
}

impl Command {
    pub fn parse(input: &str) -> Command {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Command::Empty;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Command::Ask(trimmed.to_string());
        };

        let parts: Vec<&str> = rest.split_whitespace().collect();
        let Some(name) = parts.first() else {
            return Command::Invalid {
                message: "empty command".to_string(),
            };
        };

        match name.to_lowercase().as_str() {
            "help" | "h" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            "reset" => Command::Reset,
            "history" => Command::History,
            "prompts" => Command::Prompts,
            "model" => match parts.get(1) {
                None => Command::Model { choice: None },
                Some(value) => match value.parse::<ModelChoice>() {
                    Ok(choice) => Command::Model {
                        choice: Some(choice),
                    },
                    Err(message) => Command::Invalid { message },
                },
            },
            "use" => match parts.get(1).and_then(|s| s.parse::<usize>().ok()) {
                Some(index) if index > 0 => Command::Use { index },
                _ => Command::Invalid {
                    message: "usage: /use <number from /prompts>".to_string(),
                },
            },
            other => Command::Invalid {
                message: format!("unknown command: /{}", other),
            },
        }
    }
}

pub const HELP_TEXT: &str = "\
Commands:
  /model [primary|secondary]  show or switch the backend
  /prompts                    list saved prompts
  /use <n>                    ask saved prompt number n
  /history                    show the conversation so far
  /reset                      clear the conversation
  /quit                       leave
Press Ctrl-C while a request runs to cancel it.";
