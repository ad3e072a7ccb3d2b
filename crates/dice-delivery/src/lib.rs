//! Bet transaction submission and confirmation tracking.
//!
//! The [`TransactionSubmitter`] seam turns a validated bet intent into a
//! broadcast transaction and waits for finality. Submission always simulates
//! first: a revert during simulation is surfaced as a rejection without
//! anything reaching the chain.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use dice_types::{BetIntent, ConfirmationRecord, SubmissionReceipt, TransactionHash};

pub mod implementations {
	pub mod evm;
}

pub use implementations::evm::AlloySubmitter;

/// Errors from bet submission and confirmation tracking.
#[derive(Debug, Error)]
pub enum SubmissionError {
	/// Signing was declined or the simulation/transaction reverted. No funds
	/// moved (gas aside for an on-chain revert); safe to reset immediately.
	#[error("submission rejected: {0}")]
	Rejected(String),
	/// Transport failure. Surfaces from `submit` before anything is
	/// broadcast; during confirmation tracking, read errors are retried
	/// internally until the budget expires instead.
	#[error("network error: {0}")]
	Network(String),
	#[error("failed to decode confirmation logs: {0}")]
	Decode(String),
	/// The transaction did not reach the confirmation depth in time.
	#[error("transaction {0} not confirmed within {1:?}")]
	ConfirmationTimeout(TransactionHash, Duration),
}

/// Confirmation tracking parameters.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
	/// Blocks on top of inclusion before a transaction counts as final.
	pub confirmations: u64,
	/// Budget for the confirmation wait; exceeding it is terminal.
	pub confirmation_timeout: Duration,
	/// Receipt poll interval.
	pub poll_interval: Duration,
}

impl Default for SubmitterConfig {
	fn default() -> Self {
		Self {
			confirmations: 1,
			confirmation_timeout: Duration::from_secs(180),
			poll_interval: Duration::from_secs(5),
		}
	}
}

/// Turns a validated bet intent into a submitted transaction and tracks it
/// to finality.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
	/// Simulates and broadcasts the bet. A simulation revert (insufficient
	/// funds, precondition failure) is a [`SubmissionError::Rejected`] and
	/// nothing is broadcast.
	async fn submit(&self, intent: &BetIntent) -> Result<SubmissionReceipt, SubmissionError>;

	/// Waits until the submitted transaction reaches the configured
	/// confirmation depth, returning its decoded game logs.
	async fn wait_for_confirmation(
		&self,
		receipt: &SubmissionReceipt,
	) -> Result<ConfirmationRecord, SubmissionError>;
}

/// Utility function to truncate a transaction hash for display.
pub(crate) fn truncate_hash(hash: &TransactionHash) -> String {
	let hash_str = hex::encode(&hash.0);
	if hash_str.len() <= 8 {
		hash_str
	} else {
		format!("{}..", &hash_str[..8])
	}
}
