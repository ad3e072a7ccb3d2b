//! Bet intent types for the dice game orchestrator.
//!
//! A bet intent is the validated, immutable description of a wagered
//! prediction before any blockchain interaction takes place.

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest digit the player may predict.
pub const MAX_PREDICTION: u8 = 9;

/// Wei per whole ETH, as a decimal multiplier.
const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

/// Errors produced by local intent validation. These never reach the chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntentError {
	#[error("prediction {0} is out of range (expected 0..={MAX_PREDICTION})")]
	InvalidPrediction(u8),
	#[error("wager must be positive")]
	InvalidWager,
	#[error("wager '{0}' is not a valid decimal amount")]
	UnparsableWager(String),
	#[error("wager '{0}' is not representable in wei without precision loss")]
	WagerPrecisionLoss(String),
}

/// A user's submitted prediction and wager, prior to any blockchain
/// interaction. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetIntent {
	/// Predicted digit, 0 through 9.
	pub prediction: u8,
	/// Wager in wei, attached as transaction value.
	pub wager: U256,
}

impl BetIntent {
	/// Creates an intent, rejecting values that violate the invariants.
	pub fn new(prediction: u8, wager: U256) -> Result<Self, IntentError> {
		let intent = Self { prediction, wager };
		intent.validate()?;
		Ok(intent)
	}

	/// Re-checks the intent invariants: prediction in range, wager positive.
	pub fn validate(&self) -> Result<(), IntentError> {
		if self.prediction > MAX_PREDICTION {
			return Err(IntentError::InvalidPrediction(self.prediction));
		}
		if self.wager.is_zero() {
			return Err(IntentError::InvalidWager);
		}
		Ok(())
	}
}

/// Parses a decimal ETH amount (e.g. "0.01") into wei.
///
/// The amount must be positive and exactly representable in wei; more than
/// 18 fractional digits is rejected rather than rounded.
pub fn wager_from_eth(amount: &str) -> Result<U256, IntentError> {
	let eth: Decimal = amount
		.trim()
		.parse()
		.map_err(|_| IntentError::UnparsableWager(amount.to_string()))?;

	if eth <= Decimal::ZERO {
		return Err(IntentError::InvalidWager);
	}

	let wei = eth
		.checked_mul(Decimal::from(WEI_PER_ETH))
		.ok_or_else(|| IntentError::UnparsableWager(amount.to_string()))?;

	if wei.fract() != Decimal::ZERO {
		return Err(IntentError::WagerPrecisionLoss(amount.to_string()));
	}

	let wei = wei
		.to_u128()
		.ok_or_else(|| IntentError::WagerPrecisionLoss(amount.to_string()))?;

	Ok(U256::from(wei))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_predictions_in_range() {
		for p in 0..=MAX_PREDICTION {
			assert!(BetIntent::new(p, U256::from(1)).is_ok());
		}
	}

	#[test]
	fn rejects_out_of_range_prediction() {
		let err = BetIntent::new(10, U256::from(1)).unwrap_err();
		assert_eq!(err, IntentError::InvalidPrediction(10));
	}

	#[test]
	fn rejects_zero_wager() {
		let err = BetIntent::new(4, U256::ZERO).unwrap_err();
		assert_eq!(err, IntentError::InvalidWager);
	}

	#[test]
	fn parses_whole_and_fractional_eth() {
		assert_eq!(wager_from_eth("1").unwrap(), U256::from(WEI_PER_ETH));
		assert_eq!(
			wager_from_eth("0.01").unwrap(),
			U256::from(10_000_000_000_000_000u64)
		);
	}

	#[test]
	fn rejects_negative_and_zero_amounts() {
		assert_eq!(wager_from_eth("0").unwrap_err(), IntentError::InvalidWager);
		assert_eq!(
			wager_from_eth("-0.5").unwrap_err(),
			IntentError::InvalidWager
		);
	}

	#[test]
	fn rejects_sub_wei_precision() {
		// 19 fractional digits cannot be represented in wei.
		let err = wager_from_eth("0.0000000000000000001").unwrap_err();
		assert!(matches!(err, IntentError::WagerPrecisionLoss(_)));
	}

	#[test]
	fn rejects_garbage_input() {
		assert!(matches!(
			wager_from_eth("lots"),
			Err(IntentError::UnparsableWager(_))
		));
	}
}
