use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use nsedash::core::log::{default_level, init_logging};
use nsedash::core::period::Period;
use nsedash::dashboard::state::StatementKind;

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

impl From<Commands> for nsedash::AppCommand {
    fn from(cmd: Commands) -> nsedash::AppCommand {
        match cmd {
            Commands::Serve { host, port } => nsedash::AppCommand::Serve { host, port },
            Commands::Dashboard => nsedash::AppCommand::Dashboard,
            Commands::View {
                symbol,
                period,
                statement,
            } => nsedash::AppCommand::View {
                symbol,
                period,
                statement,
            },
            Commands::Analyze {
                period,
                from,
                to,
                count,
            } => nsedash::AppCommand::Analyze {
                period,
                from,
                to,
                count,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the stock data HTTP service
    Serve {
        /// Address to bind, overrides the configured host
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on, overrides the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Interactive dashboard against a running service
    Dashboard,
    /// Print a single dashboard snapshot
    View {
        /// Ticker to show, defaults to the first listed symbol
        symbol: Option<String>,
        /// Lookback window (1mo, 3mo, 6mo, 1y, 5y, max)
        #[arg(short, long, default_value = "1y")]
        period: Period,
        /// Also show a financial statement (income, balance, cash)
        #[arg(short, long)]
        statement: Option<StatementKind>,
    },
    /// Rank the curated symbols by performance
    Analyze {
        /// Lookback window
        #[arg(short, long, default_value = "1y")]
        period: Period,
        /// First day of an explicit window (YYYY-MM-DD), one year before --to if omitted
        #[arg(long, conflicts_with = "period")]
        from: Option<NaiveDate>,
        /// Day the explicit window ends (YYYY-MM-DD), today if omitted
        #[arg(long, conflicts_with = "period")]
        to: Option<NaiveDate>,
        /// Only analyse the first N symbols
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let serving = matches!(cli.command, Some(Commands::Serve { .. }));
    init_logging(default_level(cli.verbose, serving));

    let result = match cli.command {
        Some(Commands::Setup) => nsedash::cli::setup::setup(),
        Some(cmd) => nsedash::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
