//! Transaction delivery types.
//!
//! Types describing a submitted bet transaction and its confirmed form,
//! produced by the transaction submitter and consumed by the session
//! orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GameEvent;

/// Blockchain transaction hash representation.
///
/// Stores transaction hashes as raw bytes to support different chain formats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHash(pub Vec<u8>);

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

/// Receipt for a broadcast bet transaction, owned by the active session
/// until confirmation or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
	/// Hash of the broadcast transaction.
	pub tx_hash: TransactionHash,
	/// Unix timestamp at submission.
	pub submitted_at: u64,
}

/// The transaction after reaching finality, with its decoded game logs.
///
/// A well-formed record carries exactly one [`GameEvent::Accepted`] entry;
/// anything else is a protocol violation handled by the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
	/// Hash of the confirmed transaction.
	pub tx_hash: TransactionHash,
	/// Block the transaction was included in.
	pub block_number: u64,
	/// Game events emitted by the transaction, in log order.
	pub events: Vec<GameEvent>,
}
