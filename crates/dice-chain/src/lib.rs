//! Read-only chain access for the dice game orchestrator.
//!
//! This crate defines the [`ChainReader`] seam used by the outcome resolver
//! and the CLI, plus the RPC implementation and the contract ABI. Reads are
//! side-effect-free and may run concurrently with an active session.

use async_trait::async_trait;
use thiserror::Error;

use alloy::primitives::{Address, U256};
use dice_types::{GameEvent, RequestId, StatusSnapshot};

pub mod abi;

pub mod implementations {
	pub mod rpc;
}

pub use implementations::rpc::RpcChainReader;

/// Errors from read-only contract access.
///
/// These are transient from the orchestrator's point of view: pollers retry
/// them on the next tick and only escalate when their wait budget runs out.
#[derive(Debug, Error)]
pub enum ChainError {
	#[error("network error: {0}")]
	Network(String),
	#[error("failed to decode contract data: {0}")]
	Decode(String),
	#[error("contract call reverted: {0}")]
	Contract(String),
}

/// Bounds and correlation filters for a historical game-log query.
///
/// Queries with identical bounds are replay-safe: the same filter returns
/// the same ordered events.
#[derive(Debug, Clone, Default)]
pub struct GameLogFilter {
	/// First block to scan, inclusive.
	pub from_block: u64,
	/// Last block to scan, inclusive; latest when absent.
	pub to_block: Option<u64>,
	/// Keep only events correlated to this request.
	pub request_id: Option<RequestId>,
	/// Keep only events involving this player.
	pub player: Option<Address>,
}

impl GameLogFilter {
	pub fn from_block(from_block: u64) -> Self {
		Self {
			from_block,
			..Default::default()
		}
	}

	pub fn with_request_id(mut self, request_id: RequestId) -> Self {
		self.request_id = Some(request_id);
		self
	}

	pub fn with_player(mut self, player: Address) -> Self {
		self.player = Some(player);
		self
	}

	/// Whether a decoded event passes the correlation filters.
	pub fn matches(&self, event: &GameEvent) -> bool {
		if let Some(request_id) = self.request_id {
			if event.request_id() != request_id {
				return false;
			}
		}
		if let Some(player) = self.player {
			let event_player = match event {
				GameEvent::Accepted { player, .. }
				| GameEvent::Won { player, .. }
				| GameEvent::Lost { player, .. } => *player,
			};
			if event_player != player {
				return false;
			}
		}
		true
	}
}

/// Read-only queries against the game contract.
#[async_trait]
pub trait ChainReader: Send + Sync {
	/// Reads the per-request status accessor.
	async fn read_status(&self, request_id: RequestId) -> Result<StatusSnapshot, ChainError>;

	/// Returns decoded game events matching the filter, in log order.
	async fn game_events(&self, filter: &GameLogFilter) -> Result<Vec<GameEvent>, ChainError>;

	/// Contract bankroll available for payouts, in wei.
	async fn house_balance(&self) -> Result<U256, ChainError>;

	/// Current chain head.
	async fn block_number(&self) -> Result<u64, ChainError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn accepted(request_id: u64, player: Address) -> GameEvent {
		GameEvent::Accepted {
			player,
			wager: U256::from(1),
			prediction: U256::from(4),
			request_id: RequestId(U256::from(request_id)),
		}
	}

	#[test]
	fn filter_matches_request_id() {
		let filter = GameLogFilter::from_block(0).with_request_id(RequestId(U256::from(7)));
		assert!(filter.matches(&accepted(7, Address::ZERO)));
		assert!(!filter.matches(&accepted(8, Address::ZERO)));
	}

	#[test]
	fn filter_matches_player() {
		let player = Address::repeat_byte(0xab);
		let filter = GameLogFilter::from_block(0).with_player(player);
		assert!(filter.matches(&accepted(1, player)));
		assert!(!filter.matches(&accepted(1, Address::ZERO)));
	}

	#[test]
	fn unconstrained_filter_matches_everything() {
		let filter = GameLogFilter::from_block(0);
		assert!(filter.matches(&accepted(1, Address::ZERO)));
	}
}
