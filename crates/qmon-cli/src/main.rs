//! qmon command-line interface
//!
//! Watch the IBM Quantum job queue from a terminal.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::{CredentialArgs, OutputFormat, ViewArgs};
use commands::{backends, jobs, session, token, watch};

/// qmon - IBM Quantum job queue monitor
#[derive(Parser)]
#[command(name = "qmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(short, long, global = true, env = "QMON_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    credentials: CredentialArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a bearer token and report its expiry
    Token {
        /// Print the token value
        #[arg(long)]
        show: bool,
    },

    /// Fetch jobs once and print pending and recent tables
    Jobs {
        #[command(flatten)]
        view: ViewArgs,

        /// Print every row instead of the first page
        #[arg(short, long)]
        all: bool,

        /// Output format (table, json)
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Sample backend statuses and chart queue depths
    Backends {
        /// Output format (table, json)
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Poll continuously and redraw until Ctrl-C
    Watch {
        #[command(flatten)]
        view: ViewArgs,

        /// Poll interval in milliseconds (presets: 5000, 10000, 15000, 30000, 60000)
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Manage the cached session credentials
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Store the effective credentials in the session cache
    Save,

    /// Delete the session cache
    Clear,

    /// Show what the session cache holds
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let creds = &cli.credentials;

    // Execute command
    let result = match cli.command {
        Commands::Token { show } => token::execute(config, creds, show).await,

        Commands::Jobs { view, all, format } => jobs::execute(config, creds, &view, all, format).await,

        Commands::Backends { format } => backends::execute(config, creds, format).await,

        Commands::Watch { view, interval_ms } => watch::execute(config, creds, &view, interval_ms).await,

        Commands::Session { action } => match action {
            SessionAction::Save => session::execute_save(creds),
            SessionAction::Clear => session::execute_clear(creds),
            SessionAction::Show => session::execute_show(creds),
        },
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
