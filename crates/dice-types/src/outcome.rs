//! Outcome resolution types.
//!
//! A confirmed bet is correlated to its oracle-resolved outcome through an
//! opaque request identifier. The outcome is observed either as a terminal
//! contract event or as a resolved status read; both shapes live here.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation token linking a confirmed bet to its eventual outcome.
///
/// Created at confirmation, consumed at resolution, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub U256);

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Terminal win/loss record for a request. Immutable once observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
	/// The request this outcome resolves.
	pub request_id: RequestId,
	/// Whether the prediction matched the drawn number.
	pub won: bool,
	/// Unix timestamp when the outcome was observed.
	pub resolved_at: u64,
}

/// Snapshot of the contract's per-request status accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
	/// Whether the oracle has resolved this request.
	pub resolved: bool,
	/// Win flag, meaningful only when `resolved` is true.
	pub won: bool,
	/// The number drawn by the oracle, meaningful only when resolved.
	pub house_number: U256,
}

/// Decoded game contract event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
	/// The contract accepted a bet and requested randomness.
	Accepted {
		player: Address,
		wager: U256,
		prediction: U256,
		request_id: RequestId,
	},
	/// The oracle resolved the request in the player's favour.
	Won {
		request_id: RequestId,
		player: Address,
		payout: U256,
	},
	/// The oracle resolved the request against the player.
	Lost {
		request_id: RequestId,
		player: Address,
	},
}

impl GameEvent {
	/// The request this event is correlated to.
	pub fn request_id(&self) -> RequestId {
		match self {
			GameEvent::Accepted { request_id, .. }
			| GameEvent::Won { request_id, .. }
			| GameEvent::Lost { request_id, .. } => *request_id,
		}
	}

	/// Win flag for terminal events, `None` for acceptance.
	pub fn terminal_outcome(&self) -> Option<bool> {
		match self {
			GameEvent::Accepted { .. } => None,
			GameEvent::Won { .. } => Some(true),
			GameEvent::Lost { .. } => Some(false),
		}
	}
}
