// Copyright 2025 RISC Zero, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! [ChainClient] backed by an alloy HTTP provider.

use std::time::Duration;

use alloy::{
    eips::BlockNumberOrTag,
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, TxHash, U256},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::{
        client::RpcClient,
        types::{Filter, Transaction, TransactionRequest},
    },
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
    transports::http::{
        reqwest::{
            self,
            header::{HeaderMap, HeaderValue},
        },
        Http,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use crate::{
    client::{
        BlockWindow, ChainClient, ClaimMode, ClaimReceipt, EventKind, FeeHistoryData,
        FeeOverrides, LogEvent,
    },
    contracts::{extract_tx_logs, IAxsStaking},
    ChainError,
};

/// Header carrying the gateway API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Per-request HTTP timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Chain access for a single staking account.
///
/// Constructed once per run and passed to the components that need it.
#[derive(Clone)]
pub struct AlloyChainClient {
    provider: DynProvider,
    staking_pool: Address,
    mode: ClaimMode,
}

impl AlloyChainClient {
    /// Connect to `rpc_url`, authenticating every request with `api_key`.
    ///
    /// Without a `signer` the client is read-only and [ChainClient::submit_claim] fails.
    pub fn connect(
        rpc_url: Url,
        api_key: &str,
        signer: Option<PrivateKeySigner>,
        staking_pool: Address,
        mode: ClaimMode,
        request_timeout: Option<Duration>,
    ) -> Result<Self, ChainError> {
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| ChainError::Transport(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to build HTTP client: {e}")))?;
        let client = RpcClient::new(Http::with_client(http, rpc_url), false);

        let provider = match signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer))
                .connect_client(client)
                .erased(),
            None => ProviderBuilder::new().connect_client(client).erased(),
        };

        Ok(Self::new(provider, staking_pool, mode))
    }

    pub fn new(provider: DynProvider, staking_pool: Address, mode: ClaimMode) -> Self {
        Self { provider, staking_pool, mode }
    }

    pub fn staking_pool(&self) -> Address {
        self.staking_pool
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_chain_id().await?)
    }

    /// Whether bytecode exists at the staking pool address.
    ///
    /// The gateway answers unauthenticated requests with an error, so this doubles as an API
    /// key check.
    pub async fn contract_deployed(&self) -> Result<bool, ChainError> {
        let code = self.provider.get_code_at(self.staking_pool).await?;
        Ok(!code.is_empty())
    }

    /// Staked principal of `account`.
    pub async fn staked_amount(&self, account: Address) -> Result<U256, ChainError> {
        let staking = IAxsStaking::new(self.staking_pool, &self.provider);
        Ok(staking.getStakingAmount(account).call().await?)
    }

    /// Wait for the receipt of a submitted claim.
    pub async fn confirm(
        &self,
        tx_hash: TxHash,
        timeout: Option<Duration>,
    ) -> Result<ClaimReceipt, ChainError> {
        tracing::debug!(?timeout, %tx_hash, "Waiting for transaction receipt");
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_timeout(timeout)
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transport(format!("failed to receive receipt: {e}")))?;

        let claimed = extract_tx_logs::<IAxsStaking::RewardClaimed>(&receipt)?
            .into_iter()
            .map(|log| log.data().amount)
            .sum::<U256>();

        Ok(ClaimReceipt {
            tx_hash: receipt.transaction_hash,
            success: receipt.status(),
            block_number: receipt.block_number,
            claimed,
        })
    }

    /// Look up a transaction by hash.
    pub async fn transaction(&self, tx_hash: TxHash) -> Result<Option<Transaction>, ChainError> {
        Ok(self.provider.get_transaction_by_hash(tx_hash).await?)
    }

    fn logs_filter(&self, window: BlockWindow, kind: EventKind, account: Address) -> Filter {
        Filter::new()
            .address(self.staking_pool)
            .event_signature(kind.signature_hash())
            .topic1(account.into_word())
            .from_block(BlockNumberOrTag::Number(window.start()))
            .to_block(BlockNumberOrTag::Number(window.end()))
    }

    fn claim_calldata(&self) -> Vec<u8> {
        match self.mode {
            ClaimMode::Restake => IAxsStaking::restakeRewardsCall {}.abi_encode(),
            ClaimMode::Claim => IAxsStaking::claimPendingRewardsCall {}.abi_encode(),
        }
    }
}

/// Convert a block header timestamp in seconds to a UTC date-time.
fn block_time(block: u64, timestamp: u64) -> Result<DateTime<Utc>, ChainError> {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or(ChainError::InvalidTimestamp { block, timestamp })
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn current_height(&self) -> Result<u64, ChainError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn block_timestamp(&self, height: u64) -> Result<DateTime<Utc>, ChainError> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(height))
            .await?
            .ok_or(ChainError::MissingBlock(height))?;
        block_time(height, block.header.timestamp)
    }

    async fn query_logs(
        &self,
        window: BlockWindow,
        kind: EventKind,
        account: Address,
    ) -> Result<Vec<LogEvent>, ChainError> {
        let logs = self.provider.get_logs(&self.logs_filter(window, kind, account)).await?;
        Ok(logs
            .into_iter()
            // Pending logs carry no block number and cannot be placed in the sequence.
            .filter_map(|log| log.block_number)
            .map(|block_number| LogEvent { block_number, kind, account })
            .collect())
    }

    async fn account_balance(&self, account: Address) -> Result<U256, ChainError> {
        Ok(self.provider.get_balance(account).await?)
    }

    async fn account_nonce(&self, account: Address) -> Result<u64, ChainError> {
        Ok(self.provider.get_transaction_count(account).await?)
    }

    async fn pending_rewards(&self, account: Address) -> Result<U256, ChainError> {
        let staking = IAxsStaking::new(self.staking_pool, &self.provider);
        Ok(staking.getPendingRewards(account).call().await?)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn fee_history(
        &self,
        block_count: u64,
        percentiles: &[f64],
    ) -> Result<FeeHistoryData, ChainError> {
        let history = self
            .provider
            .get_fee_history(block_count, BlockNumberOrTag::Pending, percentiles)
            .await?;
        Ok(FeeHistoryData {
            base_fee_per_gas: history.base_fee_per_gas,
            reward: history.reward.unwrap_or_default(),
        })
    }

    async fn submit_claim(
        &self,
        account: Address,
        overrides: Option<FeeOverrides>,
    ) -> Result<TxHash, ChainError> {
        let mut tx = TransactionRequest::default()
            .with_from(account)
            .with_to(self.staking_pool)
            .with_input(self.claim_calldata());
        if let Some(overrides) = overrides {
            tx = overrides.apply(tx);
        }

        tracing::trace!("Calling {}()", self.mode.function_name());
        let pending = self.provider.send_transaction(tx).await?;
        Ok(*pending.tx_hash())
    }
}

#[cfg(test)]
mod tests {
    use alloy::{
        primitives::{address, b256, Bytes, B256},
        sol_types::SolEvent,
        transports::mock::Asserter,
    };
    use serde_json::json;

    use super::*;
    use crate::RpcErrorKind;

    const POOL: Address = address!("0x05b0bb3c1c320b280501b86706c3551995bc8571");
    const ACCOUNT: Address = address!("0x00000000000000000000000000000000000000aa");
    const TX_HASH: TxHash =
        b256!("0x1111111111111111111111111111111111111111111111111111111111111111");

    fn mocked(mode: ClaimMode) -> (AlloyChainClient, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .connect_mocked_client(asserter.clone())
            .erased();
        (AlloyChainClient::new(provider, POOL, mode), asserter)
    }

    fn block_json(number: u64, timestamp: u64) -> serde_json::Value {
        let zero = B256::ZERO;
        json!({
            "hash": b256!("0x2222222222222222222222222222222222222222222222222222222222222222"),
            "parentHash": zero,
            "sha3Uncles": zero,
            "miner": Address::ZERO,
            "stateRoot": zero,
            "transactionsRoot": zero,
            "receiptsRoot": zero,
            "logsBloom": format!("0x{}", "00".repeat(256)),
            "difficulty": "0x0",
            "number": format!("{number:#x}"),
            "gasLimit": "0x1c9c380",
            "gasUsed": "0x0",
            "timestamp": format!("{timestamp:#x}"),
            "extraData": "0x",
            "mixHash": zero,
            "nonce": "0x0000000000000000",
            "uncles": [],
            "transactions": []
        })
    }

    #[test]
    fn logs_filter_targets_account_and_window() {
        let (client, _) = mocked(ClaimMode::Restake);
        let window = BlockWindow::new(1_000, 1_499).unwrap();
        let filter = client.logs_filter(window, EventKind::Claimed, ACCOUNT);

        assert!(filter.address.matches(&POOL));
        assert!(!filter.address.matches(&ACCOUNT));
        assert!(filter.topics[0].matches(&IAxsStaking::RewardClaimed::SIGNATURE_HASH));
        assert!(!filter.topics[0].matches(&IAxsStaking::Staked::SIGNATURE_HASH));
        assert!(filter.topics[1].matches(&ACCOUNT.into_word()));
        assert_eq!(filter.get_from_block(), Some(1_000));
        assert_eq!(filter.get_to_block(), Some(1_499));
    }

    #[test]
    fn block_time_conversion() {
        assert_eq!(block_time(7, 1_760_000_000).unwrap().timestamp(), 1_760_000_000);
        assert!(matches!(
            block_time(7, u64::MAX),
            Err(ChainError::InvalidTimestamp { block: 7, timestamp: u64::MAX })
        ));
    }

    #[tokio::test]
    async fn reads_height_and_block_timestamp() {
        let (client, asserter) = mocked(ClaimMode::Restake);
        asserter.push_success(&"0x64");
        asserter.push_success(&block_json(100, 1_760_000_000));
        asserter.push_success(&serde_json::Value::Null);

        assert_eq!(client.current_height().await.unwrap(), 100);
        let timestamp = client.block_timestamp(100).await.unwrap();
        assert_eq!(timestamp, DateTime::from_timestamp(1_760_000_000, 0).unwrap());
        assert!(matches!(client.block_timestamp(101).await, Err(ChainError::MissingBlock(101))));
    }

    #[tokio::test]
    async fn maps_logs_and_skips_pending_entries() {
        let (client, asserter) = mocked(ClaimMode::Restake);
        let topics = [IAxsStaking::Staked::SIGNATURE_HASH, ACCOUNT.into_word()];
        asserter.push_success(&json!([
            {
                "address": POOL,
                "topics": topics,
                "data": format!("0x{}", "00".repeat(32)),
                "blockNumber": "0x3e9",
                "blockHash": B256::repeat_byte(0x33),
                "transactionHash": TX_HASH,
                "transactionIndex": "0x0",
                "logIndex": "0x0",
                "removed": false
            },
            {
                "address": POOL,
                "topics": topics,
                "data": format!("0x{}", "00".repeat(32)),
                "removed": false
            }
        ]));

        let window = BlockWindow::new(1_000, 1_499).unwrap();
        let logs = client.query_logs(window, EventKind::Staked, ACCOUNT).await.unwrap();
        assert_eq!(
            logs,
            vec![LogEvent { block_number: 1_001, kind: EventKind::Staked, account: ACCOUNT }]
        );
    }

    #[tokio::test]
    async fn fee_history_without_rewards_is_empty() {
        let (client, asserter) = mocked(ClaimMode::Restake);
        asserter.push_success(&json!({
            "oldestBlock": "0x1",
            "baseFeePerGas": ["0x0", "0x0", "0x0"],
            "gasUsedRatio": [0.5, 0.5]
        }));
        asserter.push_success(&json!({
            "oldestBlock": "0x1",
            "baseFeePerGas": ["0x64", "0x6e", "0x78"],
            "gasUsedRatio": [0.5, 0.5],
            "reward": [["0xa", "0x14"], ["0xf", "0x19"]]
        }));

        let legacy = client.fee_history(2, &[25.0, 50.0]).await.unwrap();
        assert!(legacy.reward.is_empty());
        assert_eq!(legacy.latest_base_fee(), None);

        let history = client.fee_history(2, &[25.0, 50.0]).await.unwrap();
        assert_eq!(history.base_fee_per_gas, vec![100, 110, 120]);
        assert_eq!(history.reward, vec![vec![10, 20], vec![15, 25]]);
        assert_eq!(history.latest_base_fee(), Some(110));
    }

    #[tokio::test]
    async fn reads_pending_rewards_and_bytecode() {
        let (client, asserter) = mocked(ClaimMode::Restake);
        asserter.push_success(&Bytes::from(IAxsStaking::getPendingRewardsCall::abi_encode_returns(
            &U256::from(5_000u64),
        )));
        asserter.push_success(&Bytes::new());
        asserter.push_success(&Bytes::from(vec![0x60, 0x80]));

        assert_eq!(client.pending_rewards(ACCOUNT).await.unwrap(), U256::from(5_000u64));
        assert!(!client.contract_deployed().await.unwrap());
        assert!(client.contract_deployed().await.unwrap());
    }

    #[tokio::test]
    async fn underpriced_submission_is_classified() {
        let (client, asserter) = mocked(ClaimMode::Claim);
        asserter.push_failure_msg("transaction underpriced");
        asserter.push_success(&TX_HASH);

        let overrides = FeeOverrides {
            gas_limit: 300_000,
            nonce: 3,
            pricing: crate::FeePricing::Legacy { gas_price: 20_000_000_000 },
        };
        let err = client.submit_claim(ACCOUNT, Some(overrides)).await.unwrap_err();
        assert_eq!(err.rpc_kind(), Some(RpcErrorKind::Underpriced));

        assert_eq!(client.submit_claim(ACCOUNT, Some(overrides)).await.unwrap(), TX_HASH);
        assert!(asserter.read_q().is_empty());
    }

    #[test]
    fn calldata_follows_mode() {
        let (restake, _) = mocked(ClaimMode::Restake);
        let (claim, _) = mocked(ClaimMode::Claim);
        assert_eq!(restake.claim_calldata(), IAxsStaking::restakeRewardsCall::SELECTOR.to_vec());
        assert_eq!(claim.claim_calldata(), IAxsStaking::claimPendingRewardsCall::SELECTOR.to_vec());
    }
}
