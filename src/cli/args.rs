//! Command-line argument parsing for docquery
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::ModelChoice;

/// docquery - ask questions about your indexed documents
#[derive(Parser, Debug)]
#[command(name = "docquery")]
#[command(version)]
#[command(about = "Question answering, comparison and training material over indexed documents", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only print answers and errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question
    Ask {
        /// The question
        question: String,

        /// Backend to use (primary or secondary)
        #[arg(short, long, default_value = "primary")]
        model: ModelChoice,
    },

    /// Start an interactive chat session
    Chat {
        /// Backend to start with (primary or secondary)
        #[arg(short, long, default_value = "primary")]
        model: ModelChoice,
    },

    /// Refine an existing summary for clarity and flow
    Refine {
        /// File holding the summary
        file: PathBuf,

        /// Backend to use (primary or secondary)
        #[arg(short, long, default_value = "primary")]
        model: ModelChoice,

        /// Write the refined summary here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage saved prompt templates
    Prompts {
        #[command(subcommand)]
        command: PromptsCommand,
    },

    /// Display current configuration
    Config,

    /// Check that the configured backends are reachable
    Doctor,
}

/// Prompt template subcommands
#[derive(Subcommand, Debug)]
pub enum PromptsCommand {
    /// List saved prompts
    List,

    /// Print one prompt
    Show {
        name: String,
    },

    /// Save a new prompt
    Add {
        /// Prompt text
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        /// Read the prompt text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Rename a prompt
    Rename {
        name: String,
        new_name: String,
    },

    /// Delete a prompt
    Delete {
        name: String,
    },
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Default log filter directive when RUST_LOG is unset
    pub fn log_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "docquery=warn",
            Verbosity::Normal => "docquery=info",
            Verbosity::Verbose => "docquery=debug",
            Verbosity::VeryVerbose => "docquery=trace",
        }
    }

    /// Check if should show the spinner
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if should print per-request telemetry
    pub fn show_telemetry(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["docquery", "-q", "config"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["docquery", "config"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["docquery", "-v", "config"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["docquery", "config", "-vv"]).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_ask_model_choice() {
        let args = parse(&["docquery", "ask", "What is the fee?", "--model", "secondary"]);
        match args.command {
            Commands::Ask { question, model } => {
                assert_eq!(question, "What is the fee?");
                assert_eq!(model, ModelChoice::Secondary);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = parse(&["docquery", "ask", "hi"]);
        assert!(matches!(args.command, Commands::Ask { model: ModelChoice::Primary, .. }));
    }

    #[test]
    fn test_invalid_model_rejected() {
        assert!(Args::try_parse_from(["docquery", "ask", "hi", "-m", "tertiary"]).is_err());
    }

    #[test]
    fn test_prompts_subcommands() {
        let args = parse(&["docquery", "prompts", "rename", "old.txt", "New name"]);
        match args.command {
            Commands::Prompts {
                command: PromptsCommand::Rename { name, new_name },
            } => {
                assert_eq!(name, "old.txt");
                assert_eq!(new_name, "New name");
            }
            other => panic!("unexpected command {:?}", other),
        }

        assert!(Args::try_parse_from(["docquery", "prompts", "add", "text", "--file", "x"]).is_err());
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert!(!Verbosity::Normal.show_telemetry());
        assert!(Verbosity::Verbose.show_telemetry());
        assert_eq!(Verbosity::Verbose.log_directive(), "docquery=debug");
    }
}
