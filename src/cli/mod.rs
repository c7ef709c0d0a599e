//! CLI module for docquery
//!
//! Argument parsing and terminal output.

pub mod args;
pub mod display;

pub use args::{Args, Commands, PromptsCommand, Verbosity};
