//! Exbit spread market-making bot - Entry Point
//!
//! Without a subcommand the interactive menu starts. `run`, `orders` and
//! `balances` perform one action and exit.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use exbit_bot::app::{ctrl_c, format_order, format_summary, parse_volume, write_balances};
use exbit_bot::config::{API_KEY_ENV, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use exbit_bot::{AppConfig, Application, Prompter};
use exbit_mm::MAX_LEVELS;

/// Exbitron spread market-making bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via EXBIT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive menu (default)
    Menu,
    /// Run a spread session until Ctrl-C
    Run {
        /// Trading pair, e.g. xmr_usdt
        #[arg(short, long)]
        market: String,
        /// Ladder levels per side
        #[arg(short, long, default_value_t = 10,
              value_parser = clap::value_parser!(u32).range(1..=MAX_LEVELS as i64))]
        levels: u32,
        /// Base volume; defaults to the market minimum
        #[arg(long)]
        min_volume: Option<String>,
    },
    /// List open orders for a market
    Orders {
        #[arg(short, long)]
        market: String,
    },
    /// List account balances
    Balances,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > EXBIT_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let (config, found) = AppConfig::from_file_or_default(&config_path)?;

    exbit_telemetry::init_logging(&config.logging)?;
    info!("Starting Exbit bot v{}", env!("CARGO_PKG_VERSION"));
    if found {
        info!(config_path = %config_path, "Configuration loaded");
    } else {
        warn!(config_path = %config_path, "Config file not found, using defaults");
    }

    let mut prompter = Prompter::stdio();
    prompter.say("Welcome to ExbitBot!").await?;
    let api_key = match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            prompter
                .ask_non_empty("Please enter your private API key: ")
                .await?
        }
    };
    let app = Application::new(config, api_key)?;

    match args.command.unwrap_or(Command::Menu) {
        Command::Menu => {
            let balances = match app.verify_account().await {
                Ok(balances) => balances,
                Err(e) => {
                    prompter
                        .say(format!("Invalid API key or unable to fetch balances: {e}"))
                        .await?;
                    return Err(e.into());
                }
            };
            write_balances(&mut prompter, &balances).await?;
            app.run_menu(&mut prompter).await?;
        }
        Command::Run {
            market,
            levels,
            min_volume,
        } => {
            let min_volume = min_volume.as_deref().map(parse_volume).transpose()?;
            app.verify_account().await?;
            let plan = app.precheck(&market).await?;
            let scheduler = app.build_scheduler(&plan, levels, min_volume)?;
            prompter
                .say(format!("Starting spread trading for {market}... (Ctrl-C to stop)"))
                .await?;
            let summary = app.run_session(&scheduler, ctrl_c()).await?;
            prompter.say(format_summary(&summary)).await?;
        }
        Command::Orders { market } => {
            let orders = app.open_orders(&market).await?;
            if orders.is_empty() {
                prompter.say("No open orders.").await?;
            }
            for order in &orders {
                prompter.say(format_order(order)).await?;
            }
        }
        Command::Balances => {
            let balances = app.balances().await?;
            write_balances(&mut prompter, &balances).await?;
        }
    }

    info!("Exbit bot stopped");
    Ok(())
}
