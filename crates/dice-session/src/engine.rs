//! The session driver.
//!
//! [`SessionEngine`] sequences one session across its two long-lived waits
//! (transaction finality and oracle resolution). Phase transitions happen
//! under a short-lived lock; the lock is never held across an await, so the
//! suspended waits leave the machine observable (and re-entry attempts
//! rejectable) at all times.

use std::sync::{Arc, Mutex};
use tracing::debug;

use dice_delivery::{SubmissionError, TransactionSubmitter};
use dice_resolver::{OutcomeResolver, ResolveError};
use dice_types::{
	BetIntent, EventBus, FailureCause, OutcomeRecord, Session, SessionEvent, SessionPhase,
};

use crate::machine::SessionStateMachine;
use crate::notify::{Notification, Notifier};
use crate::SessionError;

/// Maps a failure from `submit` to the session's terminal cause.
///
/// Network failures here happen before (or instead of) a broadcast, so no
/// funds are at risk; they share the safe-to-reset rejected cause.
fn submit_cause(error: SubmissionError) -> FailureCause {
	match error {
		SubmissionError::Rejected(reason) | SubmissionError::Network(reason) => {
			FailureCause::SubmissionRejected(reason)
		}
		SubmissionError::Decode(reason) => FailureCause::ProtocolViolation(reason),
		SubmissionError::ConfirmationTimeout(_, _) => FailureCause::ConfirmationTimeout,
	}
}

/// Maps a failure from the confirmation wait. The wager is already in
/// flight, so an error here must never claim funds never moved: a read
/// error that survives the submitter's retries is as indeterminate as an
/// exhausted budget. The one rejection that survives broadcast is a
/// confirmed on-chain revert, where the chain itself rolled the wager back.
fn confirmation_cause(error: SubmissionError) -> FailureCause {
	match error {
		SubmissionError::Rejected(reason) => FailureCause::SubmissionRejected(reason),
		SubmissionError::Network(_) | SubmissionError::ConfirmationTimeout(_, _) => {
			FailureCause::ConfirmationTimeout
		}
		SubmissionError::Decode(reason) => FailureCause::ProtocolViolation(reason),
	}
}

fn resolve_cause(error: ResolveError) -> FailureCause {
	match error {
		ResolveError::Conflict { .. } => FailureCause::ProtocolViolation(error.to_string()),
		ResolveError::Timeout(_, _) => FailureCause::OutcomeTimeout,
	}
}

/// Drives play-sessions over the submitter/resolver/notifier collaborators.
pub struct SessionEngine {
	machine: Mutex<SessionStateMachine>,
	submitter: Arc<dyn TransactionSubmitter>,
	resolver: Arc<dyn OutcomeResolver>,
	notifier: Arc<dyn Notifier>,
	event_bus: EventBus,
}

impl SessionEngine {
	pub fn new(
		submitter: Arc<dyn TransactionSubmitter>,
		resolver: Arc<dyn OutcomeResolver>,
		notifier: Arc<dyn Notifier>,
		event_bus: EventBus,
	) -> Self {
		Self {
			machine: Mutex::new(SessionStateMachine::new()),
			submitter,
			resolver,
			notifier,
			event_bus,
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Current session phase.
	pub fn phase(&self) -> SessionPhase {
		self.lock_machine().phase()
	}

	/// Snapshot of the current session aggregate, if any.
	pub fn session(&self) -> Option<Session> {
		self.lock_machine().session().cloned()
	}

	/// Clears a terminal session, making the engine eligible for a new one.
	pub fn reset(&self) -> Result<(), SessionError> {
		self.lock_machine().reset()
	}

	/// Plays one full session: validate, submit, await confirmation, await
	/// the oracle outcome, notify. Returns the terminal outcome, or the
	/// terminal failure the session ended in.
	pub async fn play(&self, intent: BetIntent) -> Result<OutcomeRecord, SessionError> {
		let session_id = {
			let mut machine = self.lock_machine();
			machine.start_session(intent.clone())?.id
		};
		debug!(%session_id, prediction = intent.prediction, "session started");

		let receipt = match self.submitter.submit(&intent).await {
			Ok(receipt) => receipt,
			Err(e) => return Err(self.fail(session_id, submit_cause(e))),
		};
		self.lock_machine().on_submitted(receipt.clone())?;
		self.notifier.notify(Notification::Submitted {
			tx_hash: receipt.tx_hash.clone(),
		});
		self.event_bus
			.publish(SessionEvent::Submitted {
				session_id,
				tx_hash: receipt.tx_hash.clone(),
			})
			.ok();

		self.notifier.notify(Notification::AwaitingConfirmation {
			tx_hash: receipt.tx_hash.clone(),
		});
		let confirmation = match self.submitter.wait_for_confirmation(&receipt).await {
			Ok(confirmation) => confirmation,
			Err(e) => return Err(self.fail(session_id, confirmation_cause(e))),
		};

		let request_id = match self.lock_machine().on_confirmed(confirmation.clone()) {
			Ok(request_id) => request_id,
			Err(SessionError::Terminal(cause)) => {
				// The machine has already absorbed into Failed.
				self.notifier.notify(Notification::Failed {
					cause: cause.clone(),
				});
				self.event_bus
					.publish(SessionEvent::Failed {
						session_id,
						cause: cause.clone(),
					})
					.ok();
				return Err(SessionError::Terminal(cause));
			}
			Err(e) => return Err(e),
		};
		self.event_bus
			.publish(SessionEvent::Confirmed {
				session_id,
				tx_hash: confirmation.tx_hash.clone(),
				block_number: confirmation.block_number,
				request_id,
			})
			.ok();
		self.notifier
			.notify(Notification::AwaitingOutcome { request_id });

		let outcome = match self
			.resolver
			.resolve(request_id, confirmation.block_number)
			.await
		{
			Ok(outcome) => outcome,
			Err(e) => return Err(self.fail(session_id, resolve_cause(e))),
		};
		self.lock_machine().on_outcome(outcome.clone())?;

		self.notifier.notify(if outcome.won {
			Notification::Won { request_id }
		} else {
			Notification::Lost { request_id }
		});
		self.event_bus
			.publish(SessionEvent::Resolved {
				session_id,
				request_id,
				won: outcome.won,
			})
			.ok();

		Ok(outcome)
	}

	fn fail(&self, session_id: uuid::Uuid, cause: FailureCause) -> SessionError {
		self.lock_machine().on_error(cause.clone()).ok();
		self.notifier.notify(Notification::Failed {
			cause: cause.clone(),
		});
		self.event_bus
			.publish(SessionEvent::Failed {
				session_id,
				cause: cause.clone(),
			})
			.ok();
		SessionError::Terminal(cause)
	}

	fn lock_machine(&self) -> std::sync::MutexGuard<'_, SessionStateMachine> {
		self.machine.lock().expect("session machine poisoned")
	}
}
