//! The session phase machine.
//!
//! Transitions are synchronous and individually guarded; the long waits
//! between them belong to the engine. At most one session exists at a time,
//! and a terminal session must be reset before a new one can start.

use dice_types::{
	BetIntent, ConfirmationRecord, FailureCause, GameEvent, OutcomeRecord, RequestId, Session,
	SessionPhase, SubmissionReceipt,
};

use crate::SessionError;

/// Owns the single active [`Session`] and enforces its phase transitions.
#[derive(Debug, Default)]
pub struct SessionStateMachine {
	session: Option<Session>,
}

impl SessionStateMachine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Current phase; `Idle` when no session exists.
	pub fn phase(&self) -> SessionPhase {
		self.session
			.as_ref()
			.map(|s| s.phase.clone())
			.unwrap_or(SessionPhase::Idle)
	}

	/// The session aggregate, if one exists.
	pub fn session(&self) -> Option<&Session> {
		self.session.as_ref()
	}

	/// Starts a new session. Valid only from `Idle`; the intent invariants
	/// are re-checked here so an invalid intent never reaches the chain.
	pub fn start_session(&mut self, intent: BetIntent) -> Result<&Session, SessionError> {
		let phase = self.phase();
		if phase != SessionPhase::Idle {
			return Err(SessionError::SessionAlreadyActive(phase));
		}

		intent.validate()?;
		self.session = Some(Session::begin(intent));
		Ok(self.session.as_ref().expect("session just created"))
	}

	/// Records the broadcast receipt. Valid only from `Submitting`.
	pub fn on_submitted(&mut self, receipt: SubmissionReceipt) -> Result<(), SessionError> {
		let session = self.active_session("submitting", SessionPhase::Submitting)?;
		session.receipt = Some(receipt);
		session.phase = SessionPhase::AwaitingConfirmation;
		Ok(())
	}

	/// Records the confirmation and extracts the request id from the single
	/// expected acceptance log. Valid only from `AwaitingConfirmation`; zero
	/// or multiple acceptance logs is a protocol violation and fails the
	/// session.
	pub fn on_confirmed(
		&mut self,
		confirmation: ConfirmationRecord,
	) -> Result<RequestId, SessionError> {
		let session =
			self.active_session("awaiting-confirmation", SessionPhase::AwaitingConfirmation)?;

		let accepted: Vec<RequestId> = confirmation
			.events
			.iter()
			.filter(|e| matches!(e, GameEvent::Accepted { .. }))
			.map(|e| e.request_id())
			.collect();

		if accepted.len() != 1 {
			let cause = FailureCause::ProtocolViolation(format!(
				"expected exactly one acceptance log in tx {}, found {}",
				confirmation.tx_hash,
				accepted.len()
			));
			session.phase = SessionPhase::Failed(cause.clone());
			return Err(SessionError::Terminal(cause));
		}

		let request_id = accepted[0];
		session.confirmation = Some(confirmation);
		session.phase = SessionPhase::AwaitingOutcome;
		Ok(request_id)
	}

	/// Records the terminal outcome. Valid only from `AwaitingOutcome`.
	pub fn on_outcome(&mut self, outcome: OutcomeRecord) -> Result<(), SessionError> {
		let session = self.active_session("awaiting-outcome", SessionPhase::AwaitingOutcome)?;
		session.outcome = Some(outcome);
		session.phase = SessionPhase::Resolved;
		Ok(())
	}

	/// Moves the active session to `Failed`. Valid from any in-flight phase.
	pub fn on_error(&mut self, cause: FailureCause) -> Result<(), SessionError> {
		match self.session.as_mut() {
			Some(session) if !session.phase.is_terminal() => {
				session.phase = SessionPhase::Failed(cause);
				Ok(())
			}
			_ => Err(SessionError::PhaseMismatch {
				expected: "in-flight",
				actual: self.phase(),
			}),
		}
	}

	/// Clears a terminal session, returning to `Idle`.
	pub fn reset(&mut self) -> Result<(), SessionError> {
		if !self.phase().is_terminal() {
			return Err(SessionError::PhaseMismatch {
				expected: "resolved or failed",
				actual: self.phase(),
			});
		}
		self.session = None;
		Ok(())
	}

	fn active_session(
		&mut self,
		expected: &'static str,
		phase: SessionPhase,
	) -> Result<&mut Session, SessionError> {
		let actual = self.phase();
		match self.session.as_mut() {
			Some(session) if session.phase == phase => Ok(session),
			_ => Err(SessionError::PhaseMismatch { expected, actual }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy::primitives::{Address, U256};
	use dice_types::TransactionHash;

	fn intent() -> BetIntent {
		BetIntent::new(4, U256::from(10_000_000_000_000_000u64)).unwrap()
	}

	fn receipt() -> SubmissionReceipt {
		SubmissionReceipt {
			tx_hash: TransactionHash(vec![0x11; 32]),
			submitted_at: 1_700_000_000,
		}
	}

	fn accepted(request_id: u64) -> GameEvent {
		GameEvent::Accepted {
			player: Address::ZERO,
			wager: U256::from(1),
			prediction: U256::from(4),
			request_id: RequestId(U256::from(request_id)),
		}
	}

	fn confirmation(events: Vec<GameEvent>) -> ConfirmationRecord {
		ConfirmationRecord {
			tx_hash: TransactionHash(vec![0x11; 32]),
			block_number: 100,
			events,
		}
	}

	fn outcome(request_id: u64, won: bool) -> OutcomeRecord {
		OutcomeRecord {
			request_id: RequestId(U256::from(request_id)),
			won,
			resolved_at: 1_700_000_100,
		}
	}

	fn machine_awaiting_confirmation() -> SessionStateMachine {
		let mut machine = SessionStateMachine::new();
		machine.start_session(intent()).unwrap();
		machine.on_submitted(receipt()).unwrap();
		machine
	}

	#[test]
	fn invalid_intent_is_rejected_and_state_stays_idle() {
		let mut machine = SessionStateMachine::new();
		let bad = BetIntent {
			prediction: 12,
			wager: U256::from(1),
		};
		assert!(matches!(
			machine.start_session(bad),
			Err(SessionError::InvalidIntent(_))
		));
		assert_eq!(machine.phase(), SessionPhase::Idle);
	}

	#[test]
	fn start_while_active_is_rejected_without_mutation() {
		let mut machine = SessionStateMachine::new();
		machine.start_session(intent()).unwrap();
		let id = machine.session().unwrap().id;

		let err = machine.start_session(intent()).unwrap_err();
		assert!(matches!(err, SessionError::SessionAlreadyActive(_)));
		assert_eq!(machine.session().unwrap().id, id);
		assert_eq!(machine.phase(), SessionPhase::Submitting);
	}

	#[test]
	fn start_while_terminal_requires_reset_first() {
		let mut machine = machine_awaiting_confirmation();
		machine
			.on_error(FailureCause::ConfirmationTimeout)
			.unwrap();

		assert!(matches!(
			machine.start_session(intent()),
			Err(SessionError::SessionAlreadyActive(_))
		));
		machine.reset().unwrap();
		assert!(machine.start_session(intent()).is_ok());
	}

	#[test]
	fn single_acceptance_log_yields_request_id() {
		let mut machine = machine_awaiting_confirmation();
		let request_id = machine
			.on_confirmed(confirmation(vec![accepted(42)]))
			.unwrap();
		assert_eq!(request_id, RequestId(U256::from(42)));
		assert_eq!(machine.phase(), SessionPhase::AwaitingOutcome);
	}

	#[test]
	fn zero_acceptance_logs_is_a_protocol_violation() {
		let mut machine = machine_awaiting_confirmation();
		let err = machine.on_confirmed(confirmation(vec![])).unwrap_err();
		assert!(matches!(
			err,
			SessionError::Terminal(FailureCause::ProtocolViolation(_))
		));
		assert!(matches!(
			machine.phase(),
			SessionPhase::Failed(FailureCause::ProtocolViolation(_))
		));
	}

	#[test]
	fn duplicate_acceptance_logs_are_a_protocol_violation() {
		let mut machine = machine_awaiting_confirmation();
		let err = machine
			.on_confirmed(confirmation(vec![accepted(1), accepted(2)]))
			.unwrap_err();
		assert!(matches!(
			err,
			SessionError::Terminal(FailureCause::ProtocolViolation(_))
		));
	}

	#[test]
	fn callbacks_out_of_phase_are_rejected() {
		let mut machine = SessionStateMachine::new();

		// Nothing submitted yet.
		assert!(matches!(
			machine.on_submitted(receipt()),
			Err(SessionError::PhaseMismatch { .. })
		));

		machine.start_session(intent()).unwrap();

		// Confirmation cannot arrive before submission completes.
		assert!(matches!(
			machine.on_confirmed(confirmation(vec![accepted(1)])),
			Err(SessionError::PhaseMismatch { .. })
		));

		// Outcome cannot arrive before confirmation.
		machine.on_submitted(receipt()).unwrap();
		assert!(matches!(
			machine.on_outcome(outcome(1, true)),
			Err(SessionError::PhaseMismatch { .. })
		));
	}

	#[test]
	fn outcome_resolves_the_session() {
		let mut machine = machine_awaiting_confirmation();
		machine
			.on_confirmed(confirmation(vec![accepted(7)]))
			.unwrap();
		machine.on_outcome(outcome(7, true)).unwrap();

		assert_eq!(machine.phase(), SessionPhase::Resolved);
		assert!(machine.session().unwrap().outcome.as_ref().unwrap().won);
	}

	#[test]
	fn error_absorbs_any_in_flight_phase() {
		let mut machine = SessionStateMachine::new();
		machine.start_session(intent()).unwrap();
		machine
			.on_error(FailureCause::SubmissionRejected("declined".into()))
			.unwrap();
		assert!(machine.phase().is_terminal());

		// A second failure on a terminal session is rejected.
		assert!(machine.on_error(FailureCause::OutcomeTimeout).is_err());
	}

	#[test]
	fn reset_is_only_valid_from_terminal_phases() {
		let mut machine = SessionStateMachine::new();
		assert!(machine.reset().is_err());

		machine.start_session(intent()).unwrap();
		assert!(machine.reset().is_err());

		machine.on_error(FailureCause::OutcomeTimeout).unwrap();
		machine.reset().unwrap();
		assert_eq!(machine.phase(), SessionPhase::Idle);
	}
}
