//! Game contract ABI and log decoding.
//!
//! The Solidity declarations match the deployed contract: a bet is placed
//! with `play` (wager attached as value), acceptance emits `GamePlayed`
//! carrying the randomness request id, and the oracle callback emits
//! `GameWon` or `GameLost` for that id. `gameStatus` is the poll-based
//! fallback for the same resolution.

use alloy::primitives::{Log as PrimitivesLog, LogData};
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

use crate::ChainError;
use dice_types::{GameEvent, RequestId};

sol! {
	/// Emitted when the contract accepts a bet and requests randomness.
	event GamePlayed(address indexed player, uint256 amount, uint256 prediction, uint256 requestId);

	/// Emitted when the oracle resolves a request in the player's favour.
	event GameWon(uint256 indexed requestId, address indexed player, uint256 payout);

	/// Emitted when the oracle resolves a request against the player.
	event GameLost(uint256 indexed requestId, address indexed player);

	/// Places a bet on `prediction` with the wager attached as value.
	function play(uint256 prediction) external payable;

	/// Contract bankroll available for payouts.
	function houseBalance() external view returns (uint256);

	/// Per-request resolution status.
	function gameStatus(uint256 requestId) external view returns (bool resolved, bool won, uint256 houseNumber);
}

/// Decodes an RPC log into a [`GameEvent`].
///
/// Returns `Ok(None)` for logs that are not game events (other contracts,
/// unrelated topics); decode failures on a matching topic are errors.
pub fn decode_game_event(log: &Log) -> Result<Option<GameEvent>, ChainError> {
	let Some(topic0) = log.topic0() else {
		return Ok(None);
	};

	// Convert the RPC log to a primitives log for decoding.
	let prim_log = PrimitivesLog {
		address: log.address(),
		data: LogData::new_unchecked(log.topics().to_vec(), log.data().data.clone()),
	};

	let event = if *topic0 == GamePlayed::SIGNATURE_HASH {
		let decoded = GamePlayed::decode_log(&prim_log)
			.map_err(|e| ChainError::Decode(format!("GamePlayed: {}", e)))?;
		GameEvent::Accepted {
			player: decoded.data.player,
			wager: decoded.data.amount,
			prediction: decoded.data.prediction,
			request_id: RequestId(decoded.data.requestId),
		}
	} else if *topic0 == GameWon::SIGNATURE_HASH {
		let decoded = GameWon::decode_log(&prim_log)
			.map_err(|e| ChainError::Decode(format!("GameWon: {}", e)))?;
		GameEvent::Won {
			request_id: RequestId(decoded.data.requestId),
			player: decoded.data.player,
			payout: decoded.data.payout,
		}
	} else if *topic0 == GameLost::SIGNATURE_HASH {
		let decoded = GameLost::decode_log(&prim_log)
			.map_err(|e| ChainError::Decode(format!("GameLost: {}", e)))?;
		GameEvent::Lost {
			request_id: RequestId(decoded.data.requestId),
			player: decoded.data.player,
		}
	} else {
		return Ok(None);
	};

	Ok(Some(event))
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{Address, U256};

	fn rpc_log(address: Address, data: LogData) -> Log {
		Log {
			inner: PrimitivesLog { address, data },
			..Default::default()
		}
	}

	#[test]
	fn decodes_accepted_event() {
		let player = Address::repeat_byte(0x11);
		let event = GamePlayed {
			player,
			amount: U256::from(10_000_000_000_000_000u64),
			prediction: U256::from(4),
			requestId: U256::from(99),
		};
		let log = rpc_log(Address::repeat_byte(0xaa), event.encode_log_data());

		let decoded = decode_game_event(&log).unwrap().unwrap();
		assert_eq!(
			decoded,
			GameEvent::Accepted {
				player,
				wager: U256::from(10_000_000_000_000_000u64),
				prediction: U256::from(4),
				request_id: RequestId(U256::from(99)),
			}
		);
	}

	#[test]
	fn decodes_terminal_events() {
		let player = Address::repeat_byte(0x22);
		let won = GameWon {
			requestId: U256::from(7),
			player,
			payout: U256::from(5),
		};
		let lost = GameLost {
			requestId: U256::from(8),
			player,
		};

		let won_log = rpc_log(Address::ZERO, won.encode_log_data());
		let lost_log = rpc_log(Address::ZERO, lost.encode_log_data());

		assert_eq!(
			decode_game_event(&won_log).unwrap().unwrap().terminal_outcome(),
			Some(true)
		);
		assert_eq!(
			decode_game_event(&lost_log).unwrap().unwrap().terminal_outcome(),
			Some(false)
		);
	}

	#[test]
	fn ignores_unrelated_topics() {
		sol! {
			event Unrelated(uint256 indexed value);
		}
		let log = rpc_log(
			Address::ZERO,
			Unrelated {
				value: U256::from(1),
			}
			.encode_log_data(),
		);
		assert!(decode_game_event(&log).unwrap().is_none());
	}
}
