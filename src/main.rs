//! tai - ask a hosted generative model a question from the terminal.
//!
//! Reads the user name and API key stored by `tai configure`, sends the query
//! to the model and prints the rendered answer. With `--conversation` the
//! previous query is sent along as context.

mod config;
mod error;
mod history;
mod llm;
mod render;
mod runner;
mod storage;

use clap::{Parser, Subcommand};
use config::{ConfigStore, ConfigUpdate, Saved};
use error::{Result, Severity, TaiError};
use history::HistoryStore;
use llm::GeminiBackend;
use render::MarkdownRenderer;
use runner::{QueryRequest, QueryRunner};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use storage::StoragePath;
use tracing::{debug, error, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tai")]
#[command(author, version, about = "Ask a hosted generative model a question from the terminal")]
struct Cli {
    /// The question to be answered by the model
    #[arg(short = 'q', long, value_name = "TEXT")]
    query: Option<String>,

    /// Include the last query in the context of the current one
    #[arg(short = 'c', long)]
    conversation: bool,

    /// Directory holding config.json and lastquery.txt (default: ~/.tai)
    #[arg(long, global = true, env = "TAI_HOME", value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure user information and API key
    Configure {
        /// Name or nick for the user
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// API key
        #[arg(short = 'k', long)]
        key: Option<String>,

        /// Print the current configuration instead of changing it
        #[arg(short = 'g', long)]
        get: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error_log_enabled = tracing::enabled!(Level::ERROR);
            report_error(&e, &mut std::io::stderr(), error_log_enabled);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Fatal errors go through the error log when it is enabled; everything else,
/// and fatal errors with the log filtered out, is printed to `out`.
fn report_error<W: Write>(err: &TaiError, out: &mut W, error_log_enabled: bool) {
    if err.severity() == Severity::Fatal && error_log_enabled {
        error!("{}", err);
    } else {
        render::skip_best_effort(writeln!(out, "Error: {}", err));
    }
}

/// Log to stderr so stdout carries only the answer.
fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "tai=debug,reqwest=warn"
    } else {
        "tai=warn,reqwest=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let storage = StoragePath::resolve(cli.config_dir)?;
    debug!("Using storage directory {}", storage.dir().display());

    match cli.command {
        Some(Commands::Configure { username, key, get }) => {
            let update = ConfigUpdate { username, key };
            handle_configure(storage, update, get, &mut std::io::stdout().lock())
        }
        None => handle_query(storage, cli.query, cli.conversation).await,
    }
}

/// Handle the configure subcommand.
fn handle_configure<W: Write>(
    storage: StoragePath,
    update: ConfigUpdate,
    get: bool,
    out: &mut W,
) -> Result<()> {
    let store = ConfigStore::new(storage.clone());

    if get {
        let raw = store.get()?;
        render::skip_best_effort(writeln!(out, "Current configuration: {}", raw));
        return Ok(());
    }

    let saved = store.save(update)?;
    debug!("Stored configuration for user '{}'", saved.config().username);
    let printed = match saved {
        Saved::Updated(_) => writeln!(out, "Config file already exist. Configuration updated."),
        Saved::Created(_) => writeln!(
            out,
            "Configuration written to {}",
            storage.config_file().display()
        ),
    };
    render::skip_best_effort(printed);
    Ok(())
}

/// Handle query mode.
async fn handle_query(storage: StoragePath, query: Option<String>, conversation: bool) -> Result<()> {
    let request = QueryRequest {
        text: query.unwrap_or_default(),
        chain_history: conversation,
    };
    request.validate()?;

    let config = ConfigStore::new(storage.clone()).load()?;
    let backend = GeminiBackend::new().map_err(TaiError::Generation)?;
    let runner = QueryRunner::new(HistoryStore::new(storage), backend);

    let fragments = runner.run(&request, &config).await?;

    let renderer = MarkdownRenderer::for_stdout();
    render::print_response(&mut std::io::stdout().lock(), &renderer, &fragments);
    Ok(())
}
