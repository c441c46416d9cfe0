use clap::Parser;

/// Courier: a personal assistant for Outlook mail and Planner tasks, backed by
/// a local Ollama model.
///
/// Credentials are read from CLIENT_ID, CLIENT_SECRET and TENANT_ID (a `.env`
/// file in the working directory is loaded first). Log verbosity follows
/// RUST_LOG.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Ollama model to use [default: llama3.1]
    #[arg(long)]
    pub model: Option<String>,

    /// Ollama API URL [default: http://localhost:11434]
    #[arg(long = "ollama-url")]
    pub ollama_url: Option<String>,
}
