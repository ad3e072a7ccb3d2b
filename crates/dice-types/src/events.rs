//! Session event bus.
//!
//! Broadcast-based events let observers (the CLI, logs) follow a session's
//! progress without coupling to the orchestrator. Publishing is
//! fire-and-forget; a full or unsubscribed channel never blocks a phase
//! transition.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{FailureCause, RequestId, TransactionHash};

/// Events emitted as a session moves through its phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
	Submitted {
		session_id: Uuid,
		tx_hash: TransactionHash,
	},
	Confirmed {
		session_id: Uuid,
		tx_hash: TransactionHash,
		block_number: u64,
		request_id: RequestId,
	},
	Resolved {
		session_id: Uuid,
		request_id: RequestId,
		won: bool,
	},
	Failed {
		session_id: Uuid,
		cause: FailureCause,
	},
}

/// Event bus for broadcasting session events to multiple subscribers.
pub struct EventBus {
	sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
	/// Creates a new EventBus with the specified channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a new subscriber to receive events from this bus.
	pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns an error if there are no active subscribers; callers treat
	/// that as non-fatal.
	pub fn publish(
		&self,
		event: SessionEvent,
	) -> Result<(), broadcast::error::SendError<SessionEvent>> {
		self.sender.send(event)?;
		Ok(())
	}
}

impl Clone for EventBus {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}
