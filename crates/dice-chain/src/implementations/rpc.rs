//! RPC-backed chain reader.

use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, TransactionRequest};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::debug;

use crate::abi::{self, gameStatusCall, houseBalanceCall};
use crate::{ChainError, ChainReader, GameLogFilter};
use dice_types::{GameEvent, RequestId, StatusSnapshot};

/// [`ChainReader`] over an HTTP JSON-RPC provider.
pub struct RpcChainReader {
	provider: DynProvider,
	contract: Address,
}

impl RpcChainReader {
	/// Connects a read-only provider to the given RPC endpoint.
	pub fn new(rpc_url: &str, contract: Address) -> Result<Self, ChainError> {
		let url = rpc_url
			.parse()
			.map_err(|e| ChainError::Network(format!("invalid RPC URL: {}", e)))?;

		let provider = ProviderBuilder::new().connect_http(url).erased();

		Ok(Self { provider, contract })
	}

	/// Builds a reader on top of an existing provider; used by tests and by
	/// callers that share a provider with the submitter.
	pub fn with_provider(provider: DynProvider, contract: Address) -> Self {
		Self { provider, contract }
	}

	async fn call_contract(&self, calldata: Vec<u8>) -> Result<Bytes, ChainError> {
		let request = TransactionRequest {
			to: Some(self.contract.into()),
			input: Bytes::from(calldata).into(),
			..Default::default()
		};

		self.provider.call(request).await.map_err(|e| {
			if e.as_error_resp().is_some() {
				ChainError::Contract(e.to_string())
			} else {
				ChainError::Network(e.to_string())
			}
		})
	}
}

#[async_trait]
impl ChainReader for RpcChainReader {
	async fn read_status(&self, request_id: RequestId) -> Result<StatusSnapshot, ChainError> {
		let calldata = gameStatusCall {
			requestId: request_id.0,
		}
		.abi_encode();

		let bytes = self.call_contract(calldata).await?;
		let status = gameStatusCall::abi_decode_returns(&bytes)
			.map_err(|e| ChainError::Decode(format!("gameStatus: {}", e)))?;

		Ok(StatusSnapshot {
			resolved: status.resolved,
			won: status.won,
			house_number: status.houseNumber,
		})
	}

	async fn game_events(&self, filter: &GameLogFilter) -> Result<Vec<GameEvent>, ChainError> {
		let mut log_filter = Filter::new()
			.address(self.contract)
			.from_block(filter.from_block);
		if let Some(to_block) = filter.to_block {
			log_filter = log_filter.to_block(to_block);
		}

		let logs = self
			.provider
			.get_logs(&log_filter)
			.await
			.map_err(|e| ChainError::Network(format!("get_logs: {}", e)))?;

		debug!(
			count = logs.len(),
			from_block = filter.from_block,
			"fetched contract logs"
		);

		let mut events = Vec::new();
		for log in &logs {
			if let Some(event) = abi::decode_game_event(log)? {
				if filter.matches(&event) {
					events.push(event);
				}
			}
		}

		Ok(events)
	}

	async fn house_balance(&self) -> Result<U256, ChainError> {
		let bytes = self.call_contract(houseBalanceCall {}.abi_encode()).await?;
		houseBalanceCall::abi_decode_returns(&bytes)
			.map_err(|e| ChainError::Decode(format!("houseBalance: {}", e)))
	}

	async fn block_number(&self) -> Result<u64, ChainError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| ChainError::Network(format!("get_block_number: {}", e)))
	}
}
