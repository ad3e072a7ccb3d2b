//! Configuration types for the dice orchestrator.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete orchestrator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Chain and contract identity.
	pub chain: ChainSettings,
	/// Signer credentials.
	pub signer: SignerSettings,
	/// Submission and confirmation tracking.
	#[serde(default)]
	pub submission: SubmissionSettings,
	/// Outcome polling schedule.
	#[serde(default)]
	pub outcome: OutcomeSettings,
}

/// Chain and contract identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainSettings {
	/// HTTP JSON-RPC endpoint URL.
	pub rpc_url: String,
	/// Chain id, bound into the signer.
	pub chain_id: u64,
	/// Game contract address, 0x-prefixed.
	pub contract: String,
}

/// Signer credentials.
///
/// The private key is usually supplied through `${DICE_PRIVATE_KEY}`
/// substitution rather than written into the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignerSettings {
	/// Private key, 0x-prefixed hex.
	pub private_key: String,
}

/// Confirmation tracking parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionSettings {
	/// Blocks on top of inclusion before a transaction counts as final.
	pub confirmations: u64,
	/// Budget for the confirmation wait, in seconds.
	pub confirmation_timeout_secs: u64,
	/// Receipt poll interval, in seconds.
	pub poll_interval_secs: u64,
}

impl Default for SubmissionSettings {
	fn default() -> Self {
		Self {
			confirmations: 1,
			confirmation_timeout_secs: 180,
			poll_interval_secs: 5,
		}
	}
}

impl SubmissionSettings {
	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation_timeout_secs)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}
}

/// Outcome polling schedule.
///
/// The oracle's latency varies; these values tune when polls land, they are
/// not correctness assumptions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutcomeSettings {
	/// Wait before the first poll, in seconds.
	pub initial_delay_secs: u64,
	/// Fixed interval between polls, in seconds.
	pub poll_interval_secs: u64,
	/// Total wait budget, in seconds; exceeding it is terminal.
	pub max_wait_secs: u64,
}

impl Default for OutcomeSettings {
	fn default() -> Self {
		Self {
			initial_delay_secs: 30,
			poll_interval_secs: 15,
			max_wait_secs: 600,
		}
	}
}

impl OutcomeSettings {
	pub fn initial_delay(&self) -> Duration {
		Duration::from_secs(self.initial_delay_secs)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	pub fn max_wait(&self) -> Duration {
		Duration::from_secs(self.max_wait_secs)
	}
}
