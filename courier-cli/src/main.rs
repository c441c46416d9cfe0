// courier-cli/src/main.rs
mod models;
mod rendering;

use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use courier_core::{
    config::CREDENTIAL_VARS, Assistant, ClientCredentialProvider, ConfigError, CourierConfig,
    Credentials, GraphClient, OllamaClient,
};

use crate::rendering::print_formatted;

const APP_DIR: &str = "courier";
const CONFIG_FILENAME: &str = "Courier.toml";
const CONFIG_ENV_VAR: &str = "COURIER_CONFIG";
const LOG_FILE_NAME: &str = "courier.log";

fn print_welcome_message(model: &str) {
    println!("\n{}", "Courier - Personal Assistant".cyan().bold());
    println!("{}", "=".repeat(50));
    println!("Using local LLM via Ollama ({})", model.bold());
    println!("Commands:");
    println!("  - Ask me anything about your emails or tasks");
    println!("  - 'exit' or 'quit' to close");
    println!("  - 'clear' to clear conversation history");
    println!("{}", "=".repeat(50));
    println!();
}

fn print_env_template(missing: &[&str]) {
    eprintln!(
        "{} Missing environment variables: {}",
        "Error:".red(),
        missing.join(", ")
    );
    eprintln!("\nCreate a .env file with:");
    for name in CREDENTIAL_VARS {
        eprintln!("{}=your_microsoft_{}", name, name.to_lowercase());
    }
}

/// `$COURIER_CONFIG` if set, otherwise `<config_dir>/courier/Courier.toml`
/// when that file exists.
fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join(CONFIG_FILENAME))
        .filter(|p| p.is_file())
}

fn load_config(cli: &models::cli::Cli) -> Result<CourierConfig, ConfigError> {
    let config = match config_path() {
        Some(path) => CourierConfig::from_file(&path)?,
        None => {
            debug!("No configuration file found, using defaults.");
            CourierConfig::default()
        }
    };
    config.with_overrides(cli.model.clone(), cli.ollama_url.clone())
}

fn init_logging() -> Result<(PathBuf, tracing_appender::non_blocking::WorkerGuard)> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .unwrap_or_else(env::temp_dir)
        .join(APP_DIR);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let time_format = time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    )
    .context("Failed to parse log time format")?;
    let local_timer = LocalTime::new(time_format);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok((log_dir.join(LOG_FILE_NAME), guard))
}

fn thinking_spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "-"]),
    );
    pb.set_message("Thinking...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

/// Runs the read/print loop until `exit`, `quit`, Ctrl-C or Ctrl-D.
async fn run_interactive(mut assistant: Assistant, model: &str) -> Result<()> {
    print_welcome_message(model);

    let rl_config = Config::builder()
        .history_ignore_space(true)
        .edit_mode(rustyline::EditMode::Emacs)
        .auto_add_history(true)
        .build();
    let mut rl = DefaultEditor::with_config(rl_config)?;

    let history_file_path = dirs::cache_dir().map(|d| d.join(APP_DIR).join("cli_history.txt"));
    if let Some(path) = &history_file_path {
        if rl.load_history(path).is_err() {
            debug!(path = %path.display(), "No previous CLI history found or error loading.");
        }
    }

    let prompt = format!("{} ", "You:".green().bold());

    loop {
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                info!("Interrupt or EOF received, exiting interactive mode.");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                eprintln!("Error reading input: {}", err.to_string().red());
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input.to_lowercase().as_str() {
            "exit" | "quit" => break,
            "clear" => {
                assistant.clear();
                println!("{}\n", "Conversation history cleared".cyan());
                continue;
            }
            _ => {}
        }

        let pb = thinking_spinner()?;
        let result = assistant.process(input).await;
        pb.finish_and_clear();

        match result {
            Ok(reply) => {
                println!("\n{}", "Assistant:".cyan().bold());
                if let Err(e) = print_formatted(&reply) {
                    error!("Failed to render reply markdown: {}. Printing raw.", e);
                    println!("{}", reply);
                }
                println!();
            }
            Err(e) => {
                error!(error = %e, "Turn failed.");
                eprintln!("\n{} {}\n", "Error:".red(), e);
            }
        }
    }

    if let Some(path) = &history_file_path {
        if let Err(e) = rl.save_history(path) {
            warn!(path = %path.display(), error = %e, "Failed to save CLI history.");
        }
    }

    println!("{}", "Goodbye!".cyan());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = models::cli::Cli::parse();

    let (log_path, _guard) = match init_logging() {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    info!(log_path = %log_path.display(), "Logging initialized.");

    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(ConfigError::MissingCredentials(missing)) => {
            print_env_template(&missing);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("{} {}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    match start(config, credentials).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Operation failed: {:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

async fn start(config: CourierConfig, credentials: Credentials) -> Result<()> {
    let http_client = reqwest_client()?;

    println!(
        "Initializing with Ollama model: {}",
        config.completion.model.bold()
    );
    let tokens = Arc::new(ClientCredentialProvider::new(
        http_client.clone(),
        &credentials,
        &config.graph,
    ));
    tokens
        .authenticate()
        .await
        .context("Could not sign in to Microsoft 365")?;

    let ollama = OllamaClient::new(http_client.clone(), &config.completion);
    if let Err(e) = ollama.probe().await {
        warn!(error = %e, "Ollama probe failed.");
        eprintln!(
            "{} Cannot connect to Ollama at {}: {}",
            "Warning:".yellow(),
            config.completion.base_url,
            e
        );
    }

    let graph = GraphClient::new(http_client, &config.graph, tokens);
    let assistant = Assistant::new(Box::new(ollama), Box::new(graph));
    run_interactive(assistant, &config.completion.model).await
}

fn reqwest_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")
}
