//! agentflow CLI - talk to the agent backend from the terminal
//!
//! Usage:
//!   agentflow chat "Write a todo app in HTML"
//!   agentflow workflow "Write a todo app in HTML" --agent planner
//!   agentflow execute script.py --language python
//!   agentflow usage --provider anthropic

use agentflow::assemble::assemble_document;
use agentflow::backend::{Agent, HttpBackend};
use agentflow::chat::{ChatSession, SendOutcome};
use agentflow::client::AgentClient;
use agentflow::extract::extract_code_blocks;
use agentflow::language::detect_language;
use agentflow::preferences::Preferences;
use agentflow::todo::{Filter, TodoList};
use agentflow::usage::{ProviderFilter, UsageLedger};
use agentflow::workflow::{WorkflowOutcome, WorkflowRunner, WorkflowType};
use agentflow::{ClientConfig, FileStore, KeyValueStore};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "agentflow", version, about = "Drive a multi-agent LLM backend")]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend URL (overrides the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// State file (overrides the config file)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a message using the saved preferences
    Chat { message: String },
    /// Generate, execute and (if needed) debug code for a prompt
    Workflow {
        message: String,
        /// Do not ask the debugger agent when execution fails
        #[arg(long)]
        no_debug: bool,
        #[arg(long)]
        agent: Option<Agent>,
    },
    /// Execute a local file on the backend
    Execute {
        file: PathBuf,
        /// Language tag (detected from the content if omitted)
        #[arg(short, long)]
        language: Option<String>,
        #[arg(long)]
        no_debug: bool,
    },
    /// Extract code blocks from a saved response and print the runnable code
    Extract { file: PathBuf },
    /// List sessions known to the backend
    Sessions,
    /// Show one session's history
    Session { id: String },
    /// Forget the current session id
    Reset,
    /// Show or reset token usage
    Usage {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        reset: bool,
    },
    /// Show or change preferences
    Prefs {
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        temperature: Option<f32>,
        #[arg(long)]
        agent: Option<Agent>,
        #[arg(long)]
        auto_workflow: Option<bool>,
    },
    /// Manage the todo demo list
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
}

#[derive(Subcommand)]
enum TodoAction {
    Add { text: String },
    List {
        #[arg(long, default_value = "all")]
        filter: Filter,
    },
    Toggle { id: i64 },
    Delete { id: i64 },
    Clear,
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(state) = &cli.state {
        config.state_path = state.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = load_config(&cli)?;
    let store: Arc<dyn KeyValueStore> = Arc::new(
        FileStore::open(&config.state_path)
            .with_context(|| format!("Failed to open state file: {}", config.state_path.display()))?,
    );
    let backend = Arc::new(
        HttpBackend::new(&config.base_url, Duration::from_secs(config.timeout_secs))
            .context("Failed to create HTTP client")?,
    );

    match cli.command {
        Command::Chat { message } => {
            let session = ChatSession::open(backend, store)?;
            match session.send(&message).await? {
                SendOutcome::Chat(response) => {
                    if let Some(model) = response.selected_model.as_deref().or(response.model.as_deref()) {
                        eprintln!("{} {}", "Model:".dimmed(), model);
                    }
                    println!("{}", response.text().unwrap_or_default());
                }
                SendOutcome::Workflow(outcome) => print_workflow(&outcome),
            }
        }
        Command::Workflow {
            message,
            no_debug,
            agent,
        } => {
            let session = ChatSession::open(backend, store)?;
            let prefs = session.preferences()?;
            let workflow_type = if no_debug {
                WorkflowType::NoDebug
            } else {
                WorkflowType::Code
            };
            let options = prefs.workflow_options(agent.unwrap_or(Agent::Code), workflow_type);
            let runner = WorkflowRunner::new(session.client().clone());
            let outcome = runner.run(&message, &options).await;
            if let Some(response) = &outcome.code_result {
                session.record_usage(&prefs, response)?;
            }
            print_workflow(&outcome);
            if outcome.is_error() {
                std::process::exit(1);
            }
        }
        Command::Execute {
            file,
            language,
            no_debug,
        } => {
            let code = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let language =
                language.unwrap_or_else(|| detect_language(&code).as_str().to_string());
            let prefs = Preferences::load(store.as_ref())?;
            let client = AgentClient::new(backend, store);
            let options = prefs.execute_options(!no_debug);
            let result = client.execute_code(&code, &language, None, &options).await?;
            print_section("Output", result.output.as_deref().unwrap_or_default());
            if let Some(error) = result.error() {
                print_section("Error", error);
            }
            if let Some(debug) = result.debug_suggestion() {
                print_section("Debugger", debug);
            }
            if let Some(debug_error) = &result.debug_error {
                eprintln!("{} {}", "Debugger failed:".red(), debug_error);
            }
        }
        Command::Extract { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let bundle = extract_code_blocks(&text);
            if bundle.is_empty() {
                eprintln!("{}", "No code found".yellow());
            } else if bundle.is_multi_file() {
                eprintln!("{} html (assembled)", "Language:".dimmed());
                println!(
                    "{}",
                    assemble_document(&bundle.html_code, &bundle.css_code, &bundle.js_code)
                );
            } else if !bundle.html_code.is_empty() {
                eprintln!("{} html", "Language:".dimmed());
                println!("{}", bundle.html_code);
            } else {
                eprintln!("{} {}", "Language:".dimmed(), bundle.language);
                println!("{}", bundle.original_code);
            }
        }
        Command::Sessions => {
            let client = AgentClient::new(backend, store);
            let current = client.session().current()?;
            for entry in client.list_sessions().await?.sessions {
                let id = entry.id();
                if current.as_deref() == Some(id) {
                    print!("{} {}", id.bold(), "(current)".green());
                } else {
                    print!("{}", id);
                }
                match entry.summary() {
                    Some(summary) => println!("  {}", summary.dimmed()),
                    None => println!(),
                }
            }
        }
        Command::Session { id } => {
            let client = AgentClient::new(backend, store);
            let detail = client.get_session(&id).await?;
            if let Some(summary) = detail.summary.as_deref().filter(|s| !s.is_empty()) {
                print_section("Summary", summary);
            }
            for entry in detail.history {
                eprintln!("{} {}", "▶".cyan(), entry.agent.bold());
                println!("{}", entry.message);
                eprintln!("{}", "◀".magenta());
                println!("{}\n", entry.response);
            }
        }
        Command::Reset => {
            let session = ChatSession::open(backend, store)?;
            session.reset()?;
            eprintln!("{}", "Session reset".green());
        }
        Command::Usage { provider, reset } => {
            let mut ledger = UsageLedger::load(store)?;
            if reset {
                ledger.reset()?;
                eprintln!("{}", "Token usage reset".green());
                return Ok(());
            }
            let filter = provider.map_or(ProviderFilter::All, ProviderFilter::Provider);
            for (provider, model, usage, cost) in ledger.rows(&filter) {
                println!(
                    "{:<10} {:<28} {:>10} in {:>10} out  ${:.4}",
                    provider, model, usage.input, usage.output, cost
                );
            }
            let totals = ledger.totals(&filter);
            println!(
                "{} {} in, {} out, ${:.4}",
                "Total:".bold(),
                totals.input_tokens,
                totals.output_tokens,
                totals.cost
            );
        }
        Command::Prefs {
            server,
            model,
            temperature,
            agent,
            auto_workflow,
        } => {
            let session = ChatSession::open(backend, store)?;
            let mut prefs = session.preferences()?;
            let changed = server.is_some()
                || model.is_some()
                || temperature.is_some()
                || agent.is_some()
                || auto_workflow.is_some();
            if let Some(server) = server {
                prefs.mcp_server = server;
            }
            if let Some(model) = model {
                prefs.model = model;
            }
            if let Some(temperature) = temperature {
                prefs.temperature = temperature;
            }
            if let Some(agent) = agent {
                prefs.agent = agent;
            }
            if let Some(auto) = auto_workflow {
                prefs.auto_workflow = auto;
            }
            if changed {
                session.set_preferences(prefs.clone())?;
            }
            println!("{:<14} {}", "server:".dimmed(), prefs.mcp_server);
            println!("{:<14} {}", "model:".dimmed(), prefs.model);
            println!("{:<14} {}", "temperature:".dimmed(), prefs.temperature);
            println!("{:<14} {}", "agent:".dimmed(), prefs.agent);
            println!("{:<14} {}", "auto workflow:".dimmed(), prefs.auto_workflow);
        }
        Command::Todo { action } => {
            let mut todos = TodoList::load(store)?;
            match action {
                TodoAction::Add { text } => match todos.add(&text)? {
                    Some(item) => println!("{} {}", item.id, item.text),
                    None => eprintln!("{}", "Nothing to add".yellow()),
                },
                TodoAction::List { filter } => {
                    for item in todos.filtered(filter) {
                        let mark = if item.completed { "[x]".green() } else { "[ ]".normal() };
                        println!("{} {} {}", mark, item.id.to_string().dimmed(), item.text);
                    }
                    println!("{} items left", todos.items_left());
                }
                TodoAction::Toggle { id } => {
                    if !todos.toggle(id)? {
                        anyhow::bail!("No todo with id {}", id);
                    }
                }
                TodoAction::Delete { id } => {
                    if !todos.delete(id)? {
                        anyhow::bail!("No todo with id {}", id);
                    }
                }
                TodoAction::Clear => {
                    let removed = todos.clear_completed()?;
                    eprintln!("Removed {} completed", removed);
                }
            }
        }
    }

    Ok(())
}

fn print_section(title: &str, body: &str) {
    eprintln!(
        "{}",
        format!("┌─ {} ─────────────────────────────────────────────", title).cyan()
    );
    for line in body.lines() {
        println!("{}", line);
    }
    eprintln!(
        "{}",
        "└────────────────────────────────────────────────────────────".cyan()
    );
}

fn print_workflow(outcome: &WorkflowOutcome) {
    let phase = outcome.phase.map(|p| p.as_str()).unwrap_or("aborted");
    let status = if outcome.is_error() {
        phase.red()
    } else {
        phase.green()
    };
    eprintln!("{} {} - {}", "Workflow:".bold(), status, outcome.message);

    if let Some(error) = &outcome.error {
        eprintln!("{} {}", "Error:".red(), error);
        return;
    }

    if outcome.execution_result.is_none() {
        if let Some(text) = outcome.response_text() {
            println!("{}", text);
        }
        return;
    }

    if let Some(code) = &outcome.code {
        eprintln!("{} {}", "Language:".dimmed(), code.language);
        print_section("Code", &code.original);
    }
    if let Some(result) = &outcome.execution_result {
        print_section("Output", result.output.as_deref().unwrap_or_default());
        if let Some(error) = result.error() {
            print_section("Error", error);
        }
    }
    if let Some(fixed) = &outcome.fixed_result {
        if let Some(code) = outcome.code.as_ref().and_then(|c| c.fixed.as_deref()) {
            print_section("Fixed code", code);
        }
        print_section("Fixed output", fixed.output.as_deref().unwrap_or_default());
        if let Some(error) = fixed.error() {
            print_section("Fixed error", error);
        }
    }
}
