//! Alloy-based EVM submitter.
//!
//! Signs and broadcasts `play(prediction)` calls with the wager attached as
//! value, then polls receipts until the configured confirmation depth.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::future::Future;
use tracing::{debug, info, warn};

use crate::{truncate_hash, SubmissionError, SubmitterConfig, TransactionSubmitter};
use dice_chain::abi::{self, playCall};
use dice_types::{BetIntent, ConfirmationRecord, SubmissionReceipt, TransactionHash};

/// [`TransactionSubmitter`] over an Alloy provider with a local signer.
pub struct AlloySubmitter {
	provider: DynProvider,
	contract: Address,
	sender: Address,
	config: SubmitterConfig,
}

impl AlloySubmitter {
	/// Creates a submitter with the given signer wired into the provider for
	/// automatic transaction signing.
	pub fn new(
		rpc_url: &str,
		chain_id: u64,
		contract: Address,
		mut signer: PrivateKeySigner,
		config: SubmitterConfig,
	) -> Result<Self, SubmissionError> {
		let url = rpc_url
			.parse()
			.map_err(|e| SubmissionError::Network(format!("invalid RPC URL: {}", e)))?;

		signer = signer.with_chain_id(Some(chain_id));
		let sender = signer.address();
		let wallet = EthereumWallet::from(signer);

		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_http(url)
			.erased();

		Ok(Self {
			provider,
			contract,
			sender,
			config,
		})
	}

	fn play_request(&self, intent: &BetIntent) -> TransactionRequest {
		let calldata = playCall {
			prediction: U256::from(intent.prediction),
		}
		.abi_encode();

		TransactionRequest {
			from: Some(self.sender),
			to: Some(self.contract.into()),
			value: Some(intent.wager),
			input: Bytes::from(calldata).into(),
			..Default::default()
		}
	}

	/// One receipt poll. Provider errors come back as
	/// [`TxObservation::ReadError`] so the confirmation loop retries them;
	/// only a confirmed revert or undecodable logs are fatal here.
	async fn observe(
		&self,
		tx_hash: FixedBytes<32>,
		display: &TransactionHash,
	) -> Result<TxObservation, SubmissionError> {
		let tx_receipt = match self.provider.get_transaction_receipt(tx_hash).await {
			Ok(Some(tx_receipt)) => tx_receipt,
			Ok(None) => return Ok(TxObservation::NotMined),
			Err(e) => {
				return Ok(TxObservation::ReadError(format!(
					"failed to get receipt: {}",
					e
				)))
			}
		};

		let current_block = match self.provider.get_block_number().await {
			Ok(block) => block,
			Err(e) => {
				return Ok(TxObservation::ReadError(format!(
					"get_block_number: {}",
					e
				)))
			}
		};

		let tx_block = match classify_inclusion(
			tx_receipt.block_number,
			!tx_receipt.status(),
			current_block,
			self.config.confirmations,
		) {
			InclusionState::NotMined => return Ok(TxObservation::NotMined),
			InclusionState::Confirming { remaining } => {
				return Ok(TxObservation::Confirming { remaining })
			}
			InclusionState::Reverted => {
				return Err(SubmissionError::Rejected(
					"transaction reverted on-chain".to_string(),
				))
			}
			InclusionState::Final { block } => block,
		};

		let mut events = Vec::new();
		for log in tx_receipt.inner.logs() {
			if let Some(event) =
				abi::decode_game_event(log).map_err(|e| SubmissionError::Decode(e.to_string()))?
			{
				events.push(event);
			}
		}

		let truncated = truncate_hash(display);
		info!(
			tx_hash = %truncated,
			block_number = tx_block,
			"transaction confirmed"
		);

		Ok(TxObservation::Final(ConfirmationRecord {
			tx_hash: display.clone(),
			block_number: tx_block,
			events,
		}))
	}
}

/// Where a submitted transaction stands relative to the confirmation depth.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InclusionState {
	NotMined,
	Confirming { remaining: u64 },
	Reverted,
	Final { block: u64 },
}

/// A receipt without a block number is still pending, not included at
/// genesis.
fn classify_inclusion(
	block_number: Option<u64>,
	reverted: bool,
	current_block: u64,
	required: u64,
) -> InclusionState {
	let Some(block) = block_number else {
		return InclusionState::NotMined;
	};

	if reverted {
		return InclusionState::Reverted;
	}

	let confirmations = current_block.saturating_sub(block);
	if confirmations < required {
		InclusionState::Confirming {
			remaining: required - confirmations,
		}
	} else {
		InclusionState::Final { block }
	}
}

/// One observation of a submitted transaction, as seen by a receipt poll.
#[derive(Debug)]
pub(crate) enum TxObservation {
	NotMined,
	Confirming { remaining: u64 },
	/// Transient read error; retried on the poll interval.
	ReadError(String),
	Final(ConfirmationRecord),
}

/// Polls `observe` until the transaction is final or the budget expires.
///
/// Transient read errors never abort the wait on their own; the exhausted
/// confirmation budget is the only thing that escalates them.
pub(crate) async fn await_confirmation<F, Fut>(
	config: &SubmitterConfig,
	tx_hash: &TransactionHash,
	mut observe: F,
) -> Result<ConfirmationRecord, SubmissionError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<TxObservation, SubmissionError>>,
{
	let start_time = tokio::time::Instant::now();

	loop {
		if start_time.elapsed() > config.confirmation_timeout {
			return Err(SubmissionError::ConfirmationTimeout(
				tx_hash.clone(),
				config.confirmation_timeout,
			));
		}

		match observe().await? {
			TxObservation::Final(record) => return Ok(record),
			TxObservation::NotMined => {
				debug!(tx_hash = %truncate_hash(tx_hash), "not yet mined");
			}
			TxObservation::Confirming { remaining } => {
				debug!("waiting for {} more confirmations", remaining);
			}
			TxObservation::ReadError(reason) => {
				warn!(
					tx_hash = %truncate_hash(tx_hash),
					%reason,
					"receipt read failed, will retry"
				);
			}
		}

		tokio::time::sleep(config.poll_interval).await;
	}
}

#[async_trait]
impl TransactionSubmitter for AlloySubmitter {
	async fn submit(&self, intent: &BetIntent) -> Result<SubmissionReceipt, SubmissionError> {
		let request = self.play_request(intent);

		// Simulate before broadcasting. A revert here means the bet never
		// leaves the process and no funds are at risk.
		self.provider.call(request.clone()).await.map_err(|e| {
			if e.as_error_resp().is_some() {
				SubmissionError::Rejected(format!("simulation reverted: {}", e))
			} else {
				SubmissionError::Network(format!("simulation failed: {}", e))
			}
		})?;

		let pending = self.provider.send_transaction(request).await.map_err(|e| {
			if e.as_error_resp().is_some() {
				SubmissionError::Rejected(format!("broadcast rejected: {}", e))
			} else {
				SubmissionError::Network(format!("broadcast failed: {}", e))
			}
		})?;

		let tx_hash = TransactionHash(pending.tx_hash().0.to_vec());
		info!(tx_hash = %truncate_hash(&tx_hash), "submitted bet transaction");

		Ok(SubmissionReceipt {
			tx_hash,
			submitted_at: chrono::Utc::now().timestamp() as u64,
		})
	}

	async fn wait_for_confirmation(
		&self,
		receipt: &SubmissionReceipt,
	) -> Result<ConfirmationRecord, SubmissionError> {
		let tx_hash = FixedBytes::<32>::from_slice(&receipt.tx_hash.0);

		info!(
			tx_hash = %truncate_hash(&receipt.tx_hash),
			"waiting for {} confirmations (timeout: {}s)",
			self.config.confirmations,
			self.config.confirmation_timeout.as_secs()
		);

		await_confirmation(&self.config, &receipt.tx_hash, || {
			self.observe(tx_hash, &receipt.tx_hash)
		})
		.await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::VecDeque;
	use std::sync::Mutex;
	use std::time::Duration;

	fn fast_config() -> SubmitterConfig {
		SubmitterConfig {
			confirmations: 1,
			confirmation_timeout: Duration::from_millis(200),
			poll_interval: Duration::from_millis(5),
		}
	}

	fn tx_hash() -> TransactionHash {
		TransactionHash(vec![0xaa; 32])
	}

	fn record() -> ConfirmationRecord {
		ConfirmationRecord {
			tx_hash: tx_hash(),
			block_number: 100,
			events: Vec::new(),
		}
	}

	/// Feeds scripted observations to the confirmation loop; once the
	/// script runs out, the transaction stays unmined.
	async fn run_script(
		observations: Vec<Result<TxObservation, SubmissionError>>,
	) -> Result<ConfirmationRecord, SubmissionError> {
		let script = Mutex::new(VecDeque::from(observations));
		let hash = tx_hash();
		await_confirmation(&fast_config(), &hash, || {
			let next = script.lock().unwrap().pop_front();
			async move { next.unwrap_or(Ok(TxObservation::NotMined)) }
		})
		.await
	}

	#[tokio::test]
	async fn read_errors_are_retried_until_the_receipt_lands() {
		let confirmation = run_script(vec![
			Ok(TxObservation::ReadError("connection reset".to_string())),
			Ok(TxObservation::ReadError("connection reset".to_string())),
			Ok(TxObservation::Confirming { remaining: 1 }),
			Ok(TxObservation::Final(record())),
		])
		.await
		.unwrap();

		assert_eq!(confirmation.block_number, 100);
	}

	#[tokio::test]
	async fn persistent_read_errors_end_in_confirmation_timeout() {
		let hash = tx_hash();
		let err = await_confirmation(&fast_config(), &hash, || async {
			Ok(TxObservation::ReadError("connection reset".to_string()))
		})
		.await
		.unwrap_err();

		assert!(matches!(err, SubmissionError::ConfirmationTimeout(_, _)));
	}

	#[tokio::test]
	async fn unmined_transaction_exhausts_the_budget() {
		let err = run_script(vec![]).await.unwrap_err();
		assert!(matches!(err, SubmissionError::ConfirmationTimeout(_, _)));
	}

	#[tokio::test]
	async fn on_chain_revert_is_fatal_without_further_polling() {
		let err = run_script(vec![
			Ok(TxObservation::NotMined),
			Err(SubmissionError::Rejected(
				"transaction reverted on-chain".to_string(),
			)),
		])
		.await
		.unwrap_err();

		assert!(matches!(err, SubmissionError::Rejected(_)));
	}

	#[test]
	fn receipt_without_block_number_is_still_pending() {
		assert_eq!(
			classify_inclusion(None, false, 100, 1),
			InclusionState::NotMined
		);
	}

	#[test]
	fn classifies_confirmation_depth() {
		assert_eq!(
			classify_inclusion(Some(100), false, 100, 1),
			InclusionState::Confirming { remaining: 1 }
		);
		assert_eq!(
			classify_inclusion(Some(100), false, 101, 1),
			InclusionState::Final { block: 100 }
		);
	}

	#[test]
	fn reverted_inclusion_is_flagged() {
		assert_eq!(
			classify_inclusion(Some(100), true, 101, 1),
			InclusionState::Reverted
		);
	}
}
