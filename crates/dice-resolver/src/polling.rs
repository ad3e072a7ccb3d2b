//! Polling-based outcome resolution.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{OutcomeResolver, OutcomeSlot, ResolveError};
use dice_chain::{ChainReader, GameLogFilter};
use dice_types::{OutcomeRecord, RequestId};

/// Schedule for the outcome wait.
///
/// The oracle's latency varies and has no guaranteed floor; the initial
/// delay only tunes how early the first poll lands, it is not a correctness
/// assumption.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
	/// Wait before the first poll, to avoid reading the oracle mid-flight.
	pub initial_delay: Duration,
	/// Fixed interval between polls.
	pub poll_interval: Duration,
	/// Total wait budget; exceeding it resolves to a timeout, not a retry.
	pub max_wait: Duration,
}

impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			initial_delay: Duration::from_secs(30),
			poll_interval: Duration::from_secs(15),
			max_wait: Duration::from_secs(600),
		}
	}
}

/// [`OutcomeResolver`] that runs both detection strategies on one schedule.
///
/// Each tick scans terminal event logs and reads the status accessor, and
/// routes every report through an [`OutcomeSlot`], so the first-wins,
/// duplicate-is-no-op and conflict rules hold regardless of which strategy
/// lands first.
pub struct PollingResolver {
	reader: Arc<dyn ChainReader>,
	config: ResolverConfig,
}

impl PollingResolver {
	pub fn new(reader: Arc<dyn ChainReader>, config: ResolverConfig) -> Self {
		Self { reader, config }
	}

	/// Scans logs for a terminal event correlated to the request.
	async fn check_events(
		&self,
		request_id: RequestId,
		from_block: u64,
		slot: &OutcomeSlot,
	) -> Result<(), ResolveError> {
		let filter = GameLogFilter::from_block(from_block).with_request_id(request_id);
		match self.reader.game_events(&filter).await {
			Ok(events) => {
				for event in events {
					if let Some(won) = event.terminal_outcome() {
						slot.offer(request_id, won)?;
					}
				}
				Ok(())
			}
			Err(e) => {
				warn!(%request_id, error = %e, "event scan failed, will retry");
				Ok(())
			}
		}
	}

	/// Reads the status accessor; authoritative once it reports resolved.
	async fn check_status(
		&self,
		request_id: RequestId,
		slot: &OutcomeSlot,
	) -> Result<(), ResolveError> {
		match self.reader.read_status(request_id).await {
			Ok(status) if status.resolved => {
				slot.offer(request_id, status.won)?;
				Ok(())
			}
			Ok(_) => {
				debug!(%request_id, "status not yet resolved");
				Ok(())
			}
			Err(e) => {
				warn!(%request_id, error = %e, "status read failed, will retry");
				Ok(())
			}
		}
	}
}

#[async_trait]
impl OutcomeResolver for PollingResolver {
	async fn resolve(
		&self,
		request_id: RequestId,
		from_block: u64,
	) -> Result<OutcomeRecord, ResolveError> {
		let slot = OutcomeSlot::new();
		let start_time = tokio::time::Instant::now();

		info!(
			%request_id,
			from_block,
			budget_secs = self.config.max_wait.as_secs(),
			"waiting for oracle resolution"
		);

		tokio::time::sleep(self.config.initial_delay).await;

		loop {
			if start_time.elapsed() > self.config.max_wait {
				return Err(ResolveError::Timeout(request_id, self.config.max_wait));
			}

			// Both strategies run every tick; the slot reconciles them.
			self.check_events(request_id, from_block, &slot).await?;
			self.check_status(request_id, &slot).await?;

			if let Some(outcome) = slot.get() {
				info!(%request_id, won = outcome.won, "outcome resolved");
				return Ok(outcome);
			}

			tokio::time::sleep(self.config.poll_interval).await;
		}
	}
}
