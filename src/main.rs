use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use pfdash::core::log::init_logging;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for pfdash::AppCommand {
    fn from(cmd: Commands) -> pfdash::AppCommand {
        match cmd {
            Commands::Summary => pfdash::AppCommand::Summary,
            Commands::Serve => pfdash::AppCommand::Serve,
            Commands::Quote { symbol, exchange } => pfdash::AppCommand::Quote { symbol, exchange },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Start the HTTP API and the background refresh
    Serve,
    /// Display portfolio valuation and sector breakdown
    Summary,
    /// Display the latest quote and fundamentals for one stock
    Quote {
        /// Exchange-local symbol, e.g. INFY
        symbol: String,
        /// Listing exchange, e.g. NSE or BSE
        #[arg(default_value = "NSE")]
        exchange: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let quiet_level = match cli.command {
        Some(Commands::Serve) => LevelFilter::INFO,
        _ => LevelFilter::OFF,
    };
    init_logging(cli.verbose, quiet_level);

    let result = match cli.command {
        Some(Commands::Setup) => pfdash::cli::setup::setup(),
        Some(cmd) => pfdash::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
