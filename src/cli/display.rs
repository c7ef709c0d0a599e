//! Terminal output helpers shared by one-shot commands and the chat REPL

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::prompts::PromptTemplate;
use crate::workflow::RequestScope;

/// Spinner shown while a request runs
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner when `show` is set, otherwise a hidden bar
pub fn spinner_if(show: bool, message: &str) -> ProgressBar {
    if show {
        spinner(message)
    } else {
        ProgressBar::hidden()
    }
}

/// Spinner for a running workflow request
pub fn request_spinner(show: bool) -> ProgressBar {
    spinner_if(show, "Processing your request...")
}

pub fn show_banner(version: &str, model: &str) {
    let width = 64;
    println!("\n{}", "=".repeat(width).cyan());
    println!("{}", format!("  docquery {} - Document Assistant", version).bold().cyan());
    println!("{}", format!("  Model: {}", model).dimmed());
    println!("{}\n", "=".repeat(width).cyan());
    println!(
        "Ask a question (or {} for commands, {} to quit)\n",
        "/help".green(),
        "/quit".green()
    );
}

pub fn show_answer(rendered: &str) {
    println!("\n{}\n", rendered);
}

pub fn show_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message);
}

pub fn show_info(message: &str) {
    println!("{}", message.cyan());
}

pub fn show_warning(message: &str) {
    println!("{}", message.yellow());
}

/// Per-request telemetry block for verbose mode
pub fn show_telemetry(scope: &RequestScope) {
    println!("{}", format!("Request {}", scope.request_id).dimmed());
    for line in scope.telemetry.summary().lines() {
        println!("  {}", line.dimmed());
    }
}

/// Numbered prompt list; numbers are what `/use` takes
pub fn show_prompts(prompts: &[PromptTemplate]) {
    if prompts.is_empty() {
        show_warning("No saved prompts.");
        return;
    }
    for (i, prompt) in prompts.iter().enumerate() {
        println!("{:>3}. {}", (i + 1).to_string().green(), prompt.name);
    }
}
