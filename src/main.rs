//! docquery - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use docquery::{
    cli::{display, Args, Commands, PromptsCommand, Verbosity},
    config::Config,
    doctor::Doctor,
    errors::WorkflowError,
    llm::{backend_from_config, LlmRouter},
    prompts::PromptStore,
    repl::{input::InputHandler, ChatRepl},
    retrieval::HttpRetriever,
    session::{render_answer, ChatSession},
    types::ModelChoice,
    workflow::{CancelToken, Orchestrator, RequestScope, SummaryEditor, WorkflowRequest},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    let verbosity = args.verbosity();

    match &args.command {
        Commands::Ask { question, model } => run_ask(&config, question, *model, verbosity).await,
        Commands::Chat { model } => run_chat(&config, *model, verbosity).await,
        Commands::Refine { file, model, output } => {
            run_refine(&config, file, *model, output.as_deref(), verbosity).await
        }
        Commands::Prompts { command } => run_prompts(&config, command),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Doctor => run_doctor(&config).await,
    }
}

/// Install the tracing subscriber; RUST_LOG wins over -v/-q
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.verbosity().log_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if args.log_json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

async fn run_ask(config: &Config, question: &str, model: ModelChoice, verbosity: Verbosity) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config).context("Failed to set up backends")?;
    let request = WorkflowRequest::new(question).with_model(model);
    let scope = RequestScope::new(CancelToken::new());

    let pb = display::request_spinner(verbosity.show_progress());
    let result = tokio::select! {
        result = orchestrator.run_with_scope(request, &scope) => result,
        _ = tokio::signal::ctrl_c() => {
            scope.cancel.cancel();
            Err(WorkflowError::Cancelled)
        }
    };
    pb.finish_and_clear();

    match result {
        Ok(output) => {
            display::show_answer(&render_answer(&output.answer, &output.citations));
            if verbosity.show_telemetry() {
                display::show_info(&output.summary());
                display::show_telemetry(&scope);
            }
            Ok(())
        }
        Err(WorkflowError::Cancelled) => {
            display::show_warning("Request cancelled.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_chat(config: &Config, model: ModelChoice, verbosity: Verbosity) -> Result<()> {
    let orchestrator = Arc::new(Orchestrator::from_config(config).context("Failed to set up backends")?);
    let mut session = ChatSession::new(orchestrator);
    session.set_model_choice(model);

    let prompts = match open_prompt_store(config) {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(error = %e, "prompt store unavailable");
            None
        }
    };

    let input = match history_path() {
        Some(path) => InputHandler::with_history(path),
        None => InputHandler::new(),
    }
    .context("Failed to initialize line editor")?;

    ChatRepl::new(input, session, prompts, verbosity).run().await
}

async fn run_refine(
    config: &Config,
    file: &Path,
    model: ModelChoice,
    output: Option<&Path>,
    verbosity: Verbosity,
) -> Result<()> {
    let summary = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if summary.trim().is_empty() {
        anyhow::bail!("{} is empty", file.display());
    }

    let editor = SummaryEditor::new(LlmRouter::from_config(config)?);
    let scope = RequestScope::default();

    let pb = display::spinner_if(verbosity.show_progress(), "Refining summary...");
    let refined = editor.refine(&scope, &summary, model).await;
    pb.finish_and_clear();
    let refined = refined?;

    match output {
        Some(path) => {
            std::fs::write(path, &refined)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            display::show_info(&format!("Refined summary written to {}", path.display()));
        }
        None => println!("{}", refined),
    }
    Ok(())
}

fn run_prompts(config: &Config, command: &PromptsCommand) -> Result<()> {
    let store = open_prompt_store(config)?;

    match command {
        PromptsCommand::List => display::show_prompts(&store.list()?),
        PromptsCommand::Show { name } => println!("{}", store.get(name)?.text),
        PromptsCommand::Add { text, file } => {
            let text = match (text, file) {
                (Some(text), _) => text.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => anyhow::bail!("Provide the prompt text or --file"),
            };
            let saved = store.add(&text)?;
            display::show_info(&format!("Saved as {}", saved.name));
        }
        PromptsCommand::Rename { name, new_name } => {
            let renamed = store.rename(name, new_name)?;
            display::show_info(&format!("Renamed to {}", renamed));
        }
        PromptsCommand::Delete { name } => {
            store.delete(name)?;
            display::show_info(&format!("Deleted {}", name));
        }
    }
    Ok(())
}

async fn run_doctor(config: &Config) -> Result<()> {
    let doctor = Doctor::new(
        backend_from_config(&config.primary)?,
        backend_from_config(&config.secondary)?,
        Arc::new(HttpRetriever::new(&config.retrieval.endpoint)?),
        config.prompt_dir(),
    );

    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    if Doctor::overall_status(&checks) {
        println!("{}", "All required checks passed.".green());
        Ok(())
    } else {
        anyhow::bail!("Some checks failed")
    }
}

fn open_prompt_store(config: &Config) -> Result<PromptStore> {
    let store = PromptStore::from_config(config).context("Failed to open prompt directory")?;
    store.seed_defaults()?;
    Ok(store)
}

fn history_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".docquery").join("history"))
}
