//! Punctual perpetual trading terminal - Entry Point

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use punctual_contract::Address;
use punctual_core::Direction;
use punctual_terminal::{AppConfig, Application};
use std::path::PathBuf;
use tracing::info;

/// Punctual perpetual trading terminal
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PUNCTUAL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream spot/perp prices until Ctrl-C
    Watch {
        /// Rewrite this SVG chart periodically
        #[arg(long)]
        svg: Option<PathBuf>,
        /// Track this account's position and PnL
        #[arg(long)]
        address: Option<Address>,
    },
    /// Show a position and its PnL
    Position {
        /// Account to read (default: the wallet's account)
        #[arg(long)]
        address: Option<Address>,
    },
    /// Open a position
    #[command(group(ArgGroup::new("side").required(true).args(["long", "short"])))]
    Open {
        /// Margin in the chain's native unit
        #[arg(long)]
        margin: String,
        /// Leverage (1-10)
        #[arg(long, default_value_t = 1)]
        leverage: u32,
        #[arg(long)]
        long: bool,
        #[arg(long)]
        short: bool,
    },
    /// Close the open position
    Close,
    /// Show the wallet chain
    Chain {
        /// Ask the wallet to switch to the configured chain
        #[arg(long)]
        switch: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    punctual_ws::init_crypto();

    let args = Args::parse();

    let config_path = AppConfig::resolve_path(args.config);
    let config = AppConfig::load(&config_path)?;

    punctual_telemetry::init_logging(config.telemetry.log_format)?;
    info!(
        config_path = %config_path,
        symbol = %config.symbol,
        "Starting punctual terminal v{}",
        env!("CARGO_PKG_VERSION")
    );

    let app = Application::new(config);

    match args.command {
        Command::Watch { svg, address } => app.run_watch(svg, address).await?,
        Command::Position { address } => println!("{}", app.position_report(address).await?),
        Command::Open {
            margin,
            leverage,
            long,
            ..
        } => {
            let direction = if long { Direction::Long } else { Direction::Short };
            // Invalid input is reported by the notification below.
            if let Ok(preview) = app.preview(&margin, leverage, direction).await {
                println!("{preview}");
            }
            let notification = app.open(&margin, leverage, direction).await?;
            println!("{notification}");
        }
        Command::Close => {
            let (notification, after) = app.close().await?;
            println!("{notification}");
            if let Some(after) = after {
                println!("{after}");
            }
        }
        Command::Chain { switch } => {
            let status = app.chain(switch).await?;
            match status.chain {
                Some(chain) => println!("Chain: {chain}"),
                None => println!("Chain: {} (unsupported)", status.chain_id),
            }
            if let Some(target) = status.switched_to {
                println!("Switch requested: {target}");
            }
        }
    }

    Ok(())
}
