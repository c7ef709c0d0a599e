//! Interactive chat loop
//!
//! Reads a line, runs it through the chat session and prints the rendered
//! answer. Ctrl-C while a request is running cancels that request and
//! returns to the prompt; Ctrl-C at the prompt is ignored.

pub mod commands;
pub mod input;

use anyhow::Result;
use colored::*;
use tracing::warn;

use crate::cli::display;
use crate::cli::Verbosity;
use crate::errors::WorkflowError;
use crate::prompts::PromptStore;
use crate::repl::commands::{Command, HELP_TEXT};
use crate::repl::input::InputHandler;
use crate::session::ChatSession;
use crate::types::Role;

/// REPL session coordinator
pub struct ChatRepl {
    input: InputHandler,
    session: ChatSession,
    prompts: Option<PromptStore>,
    verbosity: Verbosity,
}

impl ChatRepl {
    pub fn new(
        input: InputHandler,
        session: ChatSession,
        prompts: Option<PromptStore>,
        verbosity: Verbosity,
    ) -> Self {
        Self {
            input,
            session,
            prompts,
            verbosity,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        display::show_banner(env!("CARGO_PKG_VERSION"), self.session.model_choice().as_str());

        while let Some(line) = self.input.read_line()? {
            if !self.dispatch(Command::parse(&line)).await? {
                break;
            }
        }

        if let Err(e) = self.input.save_history() {
            warn!(error = %e, "could not save input history");
        }
        println!("{}", "Goodbye!".green());
        Ok(())
    }

    /// Returns false when the loop should stop
    async fn dispatch(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Empty => {}
            Command::Ask(question) => self.ask(&question).await?,
            Command::Help => println!("{}", HELP_TEXT),
            Command::Quit => return Ok(false),
            Command::Reset => {
                self.session.reset();
                display::show_warning("Conversation cleared.");
            }
            Command::Model { choice: None } => {
                display::show_info(&format!("Current model: {}", self.session.model_choice()));
            }
            Command::Model {
                choice: Some(choice),
            } => {
                self.session.set_model_choice(choice);
                display::show_info(&format!("Switched to {}", choice));
            }
            Command::History => self.show_history(),
            Command::Prompts => match &self.prompts {
                Some(store) => display::show_prompts(&store.list()?),
                None => display::show_warning("Prompt store is not available."),
            },
            Command::Use { index } => {
                let text = match &self.prompts {
                    Some(store) => store.list()?.into_iter().nth(index - 1).map(|p| p.text),
                    None => None,
                };
                match text {
                    Some(text) => {
                        println!("{}", text.dimmed());
                        self.ask(&text).await?;
                    }
                    None => display::show_error(&format!("No saved prompt number {}", index)),
                }
            }
            Command::Invalid { message } => {
                display::show_error(&message);
                println!("Type {} for available commands", "/help".cyan());
            }
        }
        Ok(true)
    }

    async fn ask(&mut self, question: &str) -> Result<()> {
        let canceller = self.session.canceller();
        let pb = display::request_spinner(self.verbosity.show_progress());

        let result = tokio::select! {
            result = self.session.ask(question) => result,
            _ = tokio::signal::ctrl_c() => {
                canceller.cancel();
                Err(WorkflowError::Cancelled)
            }
        };
        pb.finish_and_clear();

        match result {
            Ok(reply) => {
                display::show_answer(&reply.rendered);
                if self.verbosity.show_telemetry() {
                    display::show_telemetry(&reply.scope);
                }
            }
            Err(WorkflowError::Cancelled) => display::show_warning("Request cancelled."),
            Err(e) => display::show_error(&e.to_string()),
        }
        Ok(())
    }

    fn show_history(&self) {
        if self.session.is_empty() {
            display::show_warning("No conversation yet.");
            return;
        }
        for turn in self.session.history() {
            let label = match turn.role {
                Role::User => turn.role.label().green().bold(),
                Role::Assistant => turn.role.label().cyan().bold(),
            };
            println!("{}: {}", label, turn.content);
        }
    }
}
