use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dice_config::ConfigLoader;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "dice")]
#[command(about = "VRF dice game session orchestrator", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// Path to configuration file
	#[arg(
		short,
		long,
		value_name = "FILE",
		env = "DICE_CONFIG",
		default_value = "config/dice.toml"
	)]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, env = "DICE_LOG_LEVEL", default_value = "info")]
	log_level: String,
}

#[derive(Subcommand)]
enum Commands {
	/// Play one game session: bet on a digit and wait for the oracle's verdict
	Play {
		/// Predicted digit, 0 through 9
		prediction: u8,
		/// Wager in ETH, e.g. "0.01"
		wager: String,
	},
	/// Show the contract bankroll available for payouts
	Balance,
	/// List past games for the configured player
	History {
		/// First block to scan
		#[arg(long, default_value_t = 0)]
		from_block: u64,
		/// Print decoded events as JSON
		#[arg(long)]
		json: bool,
	},
	/// One-shot status read for a pending request
	Status {
		/// Request id, decimal or 0x-prefixed hex
		request_id: String,
		/// Print the status snapshot as JSON
		#[arg(long)]
		json: bool,
	},
	/// Validate the configuration file
	Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();

	setup_tracing(&cli.log_level)?;

	let config = ConfigLoader::new()
		.with_file(&cli.config)
		.load()
		.await
		.with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

	match cli.command {
		Commands::Play { prediction, wager } => commands::play(&config, prediction, &wager).await,
		Commands::Balance => commands::balance(&config).await,
		Commands::History { from_block, json } => {
			commands::history(&config, from_block, json).await
		}
		Commands::Status { request_id, json } => {
			commands::status(&config, &request_id, json).await
		}
		Commands::Validate => {
			commands::summarize(&config, &cli.config);
			Ok(())
		}
	}
}

fn setup_tracing(log_level: &str) -> Result<()> {
	let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

	tracing_subscriber::registry()
		.with(env_filter)
		.with(tracing_subscriber::fmt::layer())
		.init();

	Ok(())
}
