//! Outcome resolution for confirmed bets.
//!
//! The oracle resolves a request at an unpredictable time, observable two
//! ways: a terminal `GameWon`/`GameLost` event, or the per-request status
//! accessor flipping to resolved. Neither ordering nor mutual exclusivity
//! between the two can be assumed; whichever reports first determines the
//! outcome, a matching second report is a no-op, and a mismatching one is a
//! protocol violation.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use dice_types::{OutcomeRecord, RequestId};

pub mod polling;

pub use polling::{PollingResolver, ResolverConfig};

/// Errors from outcome resolution.
///
/// Transient read failures are not represented here: the resolver retries
/// them on its schedule and only the exhausted wait budget escalates.
#[derive(Debug, Error)]
pub enum ResolveError {
	/// The two detection strategies reported different outcomes for the same
	/// request. Indicates a contract/oracle mismatch; fatal, never retried.
	#[error("conflicting outcomes for request {request_id}: {first} then {second}")]
	Conflict {
		request_id: RequestId,
		first: &'static str,
		second: &'static str,
	},
	/// No resolution arrived within the wait budget. The result is still
	/// pending on-chain and may be re-polled manually.
	#[error("request {0} unresolved after {1:?}")]
	Timeout(RequestId, Duration),
}

/// Result of offering an outcome to an [`OutcomeSlot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotUpdate {
	/// First report for this request; the slot now holds it.
	Recorded,
	/// Identical to the already-held outcome; ignored.
	Duplicate,
}

fn outcome_name(won: bool) -> &'static str {
	if won {
		"won"
	} else {
		"lost"
	}
}

/// First-wins cell reconciling the two detection strategies.
///
/// The check-then-act is done under one lock so competing reports cannot
/// interleave between the check and the write.
#[derive(Debug, Default)]
pub struct OutcomeSlot {
	inner: Mutex<Option<OutcomeRecord>>,
}

impl OutcomeSlot {
	pub fn new() -> Self {
		Self::default()
	}

	/// Offers an outcome. The first report is recorded; an identical second
	/// report is a no-op; a differing second report is a conflict.
	pub fn offer(&self, request_id: RequestId, won: bool) -> Result<SlotUpdate, ResolveError> {
		let mut slot = self.inner.lock().expect("outcome slot poisoned");
		match slot.as_ref() {
			None => {
				*slot = Some(OutcomeRecord {
					request_id,
					won,
					resolved_at: chrono::Utc::now().timestamp() as u64,
				});
				Ok(SlotUpdate::Recorded)
			}
			Some(existing) if existing.won == won => Ok(SlotUpdate::Duplicate),
			Some(existing) => Err(ResolveError::Conflict {
				request_id,
				first: outcome_name(existing.won),
				second: outcome_name(won),
			}),
		}
	}

	/// The recorded outcome, if any strategy has reported yet.
	pub fn get(&self) -> Option<OutcomeRecord> {
		self.inner.lock().expect("outcome slot poisoned").clone()
	}
}

/// Maps a request id to its terminal outcome, however long the oracle takes.
#[async_trait]
pub trait OutcomeResolver: Send + Sync {
	/// Resolves the request, scanning logs from `from_block` (the
	/// confirmation block) onward and polling the status accessor.
	async fn resolve(
		&self,
		request_id: RequestId,
		from_block: u64,
	) -> Result<OutcomeRecord, ResolveError>;
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::U256;

	fn rid(n: u64) -> RequestId {
		RequestId(U256::from(n))
	}

	#[test]
	fn first_report_wins() {
		let slot = OutcomeSlot::new();
		assert_eq!(slot.offer(rid(1), true).unwrap(), SlotUpdate::Recorded);
		let outcome = slot.get().unwrap();
		assert!(outcome.won);
		assert_eq!(outcome.request_id, rid(1));
	}

	#[test]
	fn matching_second_report_is_a_no_op() {
		let slot = OutcomeSlot::new();
		slot.offer(rid(1), false).unwrap();
		assert_eq!(slot.offer(rid(1), false).unwrap(), SlotUpdate::Duplicate);
		assert!(!slot.get().unwrap().won);
	}

	#[test]
	fn mismatching_second_report_is_a_conflict() {
		let slot = OutcomeSlot::new();
		slot.offer(rid(1), true).unwrap();
		let err = slot.offer(rid(1), false).unwrap_err();
		assert!(matches!(err, ResolveError::Conflict { .. }));
	}

	#[test]
	fn empty_slot_reports_nothing() {
		let slot = OutcomeSlot::new();
		assert!(slot.get().is_none());
	}
}
