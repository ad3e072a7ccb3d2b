//! Game-session orchestration.
//!
//! One play-session runs from "bet submitted" through "transaction
//! confirmed" to "randomness-derived outcome resolved". The phase machine
//! in [`machine`] owns the session state and rejects out-of-phase or
//! re-entrant calls; the [`engine`] drives a session across the two
//! long-lived waits (finality and oracle callback) and surfaces every
//! terminal result through the [`notify`] seam.

use thiserror::Error;

use dice_types::{FailureCause, IntentError, SessionPhase};

pub mod engine;
pub mod machine;
pub mod notify;

pub use engine::SessionEngine;
pub use machine::SessionStateMachine;
pub use notify::{Notification, Notifier, TracingNotifier};

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
	/// The intent failed local validation; nothing reached the chain.
	#[error("invalid intent: {0}")]
	InvalidIntent(#[from] IntentError),
	/// A session is already in progress; concurrent sessions are rejected,
	/// never queued.
	#[error("a session is already active (phase: {0})")]
	SessionAlreadyActive(SessionPhase),
	/// The operation is not valid in the session's current phase. The
	/// machine rejects out-of-order callbacks rather than trusting
	/// collaborators to call in order.
	#[error("operation requires phase '{expected}', session is '{actual}'")]
	PhaseMismatch {
		expected: &'static str,
		actual: SessionPhase,
	},
	/// The session ended in a terminal failure.
	#[error(transparent)]
	Terminal(FailureCause),
}
