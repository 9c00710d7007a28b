//! Tabletalk CLI Entry Point
//!
//! Loads settings, opens the one database connection, and hands control to
//! the conversation session. Conversation output goes to stdout; logs go
//! to stderr.
//!
//! Exit codes: 0 on a normal quit, 1 on any fatal error (configuration,
//! connection, schema introspection, or completion retries exhausted).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tabletalk::config::{default_settings_path, load_settings};
use tabletalk::db::postgres::PostgresDb;
use tabletalk::llm::openai::OpenAiClient;
use tabletalk::session::{Session, TerminalConsole};
use tabletalk::CompletionClient;

/// Tabletalk - Conversational SQL Agent
#[derive(Parser)]
#[command(name = "tabletalk")]
#[command(about = "Ask questions about a PostgreSQL database in plain language")]
#[command(version)]
struct Cli {
    /// Path to the settings file (default: ~/.config/tabletalk/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Annotate the schema prompt with one example value per column
    #[arg(long)]
    annotate: bool,

    /// Override the model identifier from the settings file
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings_path = match cli.config {
        Some(path) => path,
        None => default_settings_path()?,
    };

    let mut settings = load_settings(&settings_path)?;
    if let Some(model) = cli.model {
        settings.model = model;
    }

    let service = OpenAiClient::new(settings.api_key.clone())?;
    let client = CompletionClient::new(Arc::new(service), settings.model.clone());

    let db = PostgresDb::connect(&settings.connection).await?;

    let console = TerminalConsole;
    let mut session = Session::new(&db, client, &console, cli.annotate);
    let result = session.run().await;

    // The connection is released on the quit path and the fatal path alike.
    db.close().await;

    Ok(result?)
}
