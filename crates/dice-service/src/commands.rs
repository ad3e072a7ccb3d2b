//! Subcommand implementations.
//!
//! `play` wires the full orchestrator together for one session; the other
//! commands are read-only and safe to run while a session is in flight
//! elsewhere.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use alloy::primitives::U256;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use tokio::signal;
use tracing::warn;

use dice_chain::{ChainReader, GameLogFilter, RpcChainReader};
use dice_config::Config;
use dice_delivery::{AlloySubmitter, SubmitterConfig};
use dice_resolver::{PollingResolver, ResolverConfig};
use dice_session::{SessionEngine, SessionError, TracingNotifier};
use dice_types::{
	wager_from_eth, BetIntent, EventBus, FailureCause, GameEvent, OutcomeRecord, RequestId,
};

fn contract_address(config: &Config) -> Result<alloy::primitives::Address> {
	config
		.chain
		.contract
		.parse()
		.context("invalid contract address in config")
}

fn signer(config: &Config) -> Result<PrivateKeySigner> {
	config
		.signer
		.private_key
		.parse()
		.context("invalid private key in config")
}

fn chain_reader(config: &Config) -> Result<Arc<RpcChainReader>> {
	let contract = contract_address(config)?;
	Ok(Arc::new(RpcChainReader::new(
		&config.chain.rpc_url,
		contract,
	)?))
}

/// Plays one full session: submit the bet, wait for confirmation, wait for
/// the oracle, report the verdict.
pub async fn play(config: &Config, prediction: u8, wager: &str) -> Result<()> {
	let wager = wager_from_eth(wager)?;
	let intent = BetIntent::new(prediction, wager)?;

	let submitter = AlloySubmitter::new(
		&config.chain.rpc_url,
		config.chain.chain_id,
		contract_address(config)?,
		signer(config)?,
		SubmitterConfig {
			confirmations: config.submission.confirmations,
			confirmation_timeout: config.submission.confirmation_timeout(),
			poll_interval: config.submission.poll_interval(),
		},
	)?;
	let resolver = PollingResolver::new(
		chain_reader(config)?,
		ResolverConfig {
			initial_delay: config.outcome.initial_delay(),
			poll_interval: config.outcome.poll_interval(),
			max_wait: config.outcome.max_wait(),
		},
	);

	let engine = SessionEngine::new(
		Arc::new(submitter),
		Arc::new(resolver),
		Arc::new(TracingNotifier),
		EventBus::new(16),
	);

	tokio::select! {
		result = engine.play(intent) => report_session(&engine, result),
		_ = signal::ctrl_c() => {
			// A broadcast transaction cannot be withdrawn; the session is
			// abandoned, not cancelled, and is not recovered on restart.
			warn!("interrupted; abandoning the in-flight session");
			Ok(())
		}
	}
}

fn report_session(
	engine: &SessionEngine,
	result: Result<OutcomeRecord, SessionError>,
) -> Result<()> {
	match result {
		Ok(outcome) => {
			if outcome.won {
				println!("You won! (request {})", outcome.request_id);
			} else {
				println!("You lost. (request {})", outcome.request_id);
			}
			Ok(())
		}
		Err(SessionError::Terminal(FailureCause::OutcomeTimeout)) => {
			if let Some(request_id) = pending_request_id(engine) {
				println!(
					"Result pending: the oracle has not resolved request {} yet.",
					request_id
				);
				println!("Re-check later with: dice status {}", request_id);
			}
			anyhow::bail!("outcome not resolved within the wait budget")
		}
		Err(e) => Err(e.into()),
	}
}

/// Request id of the session's accepted bet, for the re-poll hint after a
/// timeout.
fn pending_request_id(engine: &SessionEngine) -> Option<RequestId> {
	engine
		.session()?
		.confirmation?
		.events
		.into_iter()
		.find_map(|e| match e {
			GameEvent::Accepted { request_id, .. } => Some(request_id),
			_ => None,
		})
}

/// Prints the contract bankroll. Side-effect-free; runs fine alongside an
/// active session.
pub async fn balance(config: &Config) -> Result<()> {
	let reader = chain_reader(config)?;
	let (balance, block) = tokio::try_join!(reader.house_balance(), reader.block_number())?;
	println!("House balance: {} ETH (block {})", format_eth(balance), block);
	Ok(())
}

/// Lists past games for the configured player, correlating each accepted
/// bet with its terminal event where one exists.
pub async fn history(config: &Config, from_block: u64, json: bool) -> Result<()> {
	let reader = chain_reader(config)?;
	let player = signer(config)?.address();

	let filter = GameLogFilter::from_block(from_block).with_player(player);
	let events = reader.game_events(&filter).await?;

	if json {
		println!("{}", serde_json::to_string_pretty(&events)?);
		return Ok(());
	}

	let outcomes: HashMap<RequestId, bool> = events
		.iter()
		.filter_map(|e| e.terminal_outcome().map(|won| (e.request_id(), won)))
		.collect();

	let mut games = 0;
	for event in &events {
		if let GameEvent::Accepted {
			wager,
			prediction,
			request_id,
			..
		} = event
		{
			games += 1;
			let verdict = match outcomes.get(request_id) {
				Some(true) => "won",
				Some(false) => "lost",
				None => "pending",
			};
			println!(
				"request {}: predicted {}, wagered {} ETH, {}",
				request_id,
				prediction,
				format_eth(*wager),
				verdict
			);
		}
	}

	if games == 0 {
		println!("No games found for {} from block {}", player, from_block);
	}
	Ok(())
}

/// One-shot status read, the manual re-poll for a request that timed out.
pub async fn status(config: &Config, request_id: &str, json: bool) -> Result<()> {
	let request_id = RequestId(
		request_id
			.parse::<U256>()
			.with_context(|| format!("invalid request id '{}'", request_id))?,
	);

	let reader = chain_reader(config)?;
	let snapshot = reader.read_status(request_id).await?;

	if json {
		println!("{}", serde_json::to_string_pretty(&snapshot)?);
	} else if !snapshot.resolved {
		println!("Request {} is not resolved yet", request_id);
	} else {
		let verdict = if snapshot.won { "won" } else { "lost" };
		println!(
			"Request {} resolved: {} (house number {})",
			request_id, verdict, snapshot.house_number
		);
	}
	Ok(())
}

/// Prints a summary of an already-validated configuration.
pub fn summarize(config: &Config, path: &Path) {
	println!("Configuration {} is valid", path.display());
	println!("Chain id: {}", config.chain.chain_id);
	println!("Contract: {}", config.chain.contract);
	println!(
		"Confirmations: {} (timeout {}s)",
		config.submission.confirmations, config.submission.confirmation_timeout_secs
	);
	println!(
		"Outcome schedule: first poll after {}s, every {}s, budget {}s",
		config.outcome.initial_delay_secs,
		config.outcome.poll_interval_secs,
		config.outcome.max_wait_secs
	);
}

/// Formats a wei amount as a decimal ETH string, trimming trailing zeros.
fn format_eth(wei: U256) -> String {
	let divisor = U256::from(1_000_000_000_000_000_000u64);
	let whole = wei / divisor;
	let frac = wei % divisor;

	if frac.is_zero() {
		return whole.to_string();
	}

	let padded = format!("{:0>18}", frac.to_string());
	format!("{}.{}", whole, padded.trim_end_matches('0'))
}
