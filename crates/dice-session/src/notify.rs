//! User-facing notifications.
//!
//! Notifications are fire-and-forget: delivery never blocks a phase
//! transition, and a lost notification never changes session state.

use tracing::{info, warn};

use dice_types::{FailureCause, RequestId, TransactionHash};

/// Informational and terminal notices surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
	Submitted { tx_hash: TransactionHash },
	AwaitingConfirmation { tx_hash: TransactionHash },
	AwaitingOutcome { request_id: RequestId },
	Won { request_id: RequestId },
	Lost { request_id: RequestId },
	Failed { cause: FailureCause },
}

/// Side-channel for surfacing session progress and terminal events.
pub trait Notifier: Send + Sync {
	fn notify(&self, notification: Notification);
}

/// Default notifier that writes through the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
	fn notify(&self, notification: Notification) {
		match notification {
			Notification::Submitted { tx_hash } => {
				info!(%tx_hash, "bet submitted");
			}
			Notification::AwaitingConfirmation { tx_hash } => {
				info!(%tx_hash, "waiting for the transaction to confirm");
			}
			Notification::AwaitingOutcome { request_id } => {
				info!(%request_id, "waiting for the oracle to resolve the game");
			}
			Notification::Won { request_id } => {
				info!(%request_id, "you won the game!");
			}
			Notification::Lost { request_id } => {
				info!(%request_id, "you lost. Better luck next time");
			}
			Notification::Failed { cause } => {
				warn!(%cause, "session failed");
			}
		}
	}
}
