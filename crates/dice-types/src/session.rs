//! Session aggregate and phase types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::{BetIntent, ConfirmationRecord, OutcomeRecord, SubmissionReceipt};

/// Terminal failure causes a session can end in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum FailureCause {
	/// Signing was declined or the pre-submission simulation reverted.
	/// No funds moved; the session may be reset immediately.
	#[error("submission rejected: {0}")]
	SubmissionRejected(String),
	/// The confirmed transaction or the oracle behaved outside the expected
	/// protocol shape. Fatal to the session, never retried.
	#[error("protocol violation: {0}")]
	ProtocolViolation(String),
	/// The transaction did not reach finality within the confirmation budget.
	#[error("confirmation timed out")]
	ConfirmationTimeout,
	/// The oracle did not resolve within the outcome budget. The result is
	/// still pending on-chain and may be re-polled manually.
	#[error("result pending: outcome not resolved within the wait budget")]
	OutcomeTimeout,
}

/// Phase of a play-session.
///
/// `Resolved` and `Failed` are terminal: only a reset is valid from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
	Idle,
	Submitting,
	AwaitingConfirmation,
	AwaitingOutcome,
	Resolved,
	Failed(FailureCause),
}

impl SessionPhase {
	pub fn is_terminal(&self) -> bool {
		matches!(self, SessionPhase::Resolved | SessionPhase::Failed(_))
	}

	/// Short phase name, without the failure cause payload.
	pub fn name(&self) -> &'static str {
		match self {
			SessionPhase::Idle => "idle",
			SessionPhase::Submitting => "submitting",
			SessionPhase::AwaitingConfirmation => "awaiting-confirmation",
			SessionPhase::AwaitingOutcome => "awaiting-outcome",
			SessionPhase::Resolved => "resolved",
			SessionPhase::Failed(_) => "failed",
		}
	}
}

impl fmt::Display for SessionPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// The aggregate root for one play-session.
///
/// Owns the intent, receipt, confirmation and outcome by composition; none
/// of these are shared across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	pub id: Uuid,
	pub phase: SessionPhase,
	pub intent: BetIntent,
	pub receipt: Option<SubmissionReceipt>,
	pub confirmation: Option<ConfirmationRecord>,
	pub outcome: Option<OutcomeRecord>,
}

impl Session {
	/// Creates a fresh session for a validated intent, entering `Submitting`.
	pub fn begin(intent: BetIntent) -> Self {
		Self {
			id: Uuid::new_v4(),
			phase: SessionPhase::Submitting,
			intent,
			receipt: None,
			confirmation: None,
			outcome: None,
		}
	}
}
