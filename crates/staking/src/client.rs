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

//! The narrow capability interface over the remote ledger, and the types that cross it.

use std::fmt;

use alloy::{
    network::TransactionBuilder,
    primitives::{Address, TxHash, B256, U256},
    rpc::types::TransactionRequest,
    sol_types::SolEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{contracts::IAxsStaking, ChainError};

/// Staking pool events that restart the reward cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Staked,
    Claimed,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Staked, EventKind::Claimed];

    /// Topic 0 of the event on the staking pool contract.
    pub fn signature_hash(self) -> B256 {
        match self {
            Self::Staked => IAxsStaking::Staked::SIGNATURE_HASH,
            Self::Claimed => IAxsStaking::RewardClaimed::SIGNATURE_HASH,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staked => f.write_str("Staked"),
            Self::Claimed => f.write_str("RewardClaimed"),
        }
    }
}

/// An inclusive range of blocks queried in a single `eth_getLogs` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    start: u64,
    end: u64,
}

impl BlockWindow {
    /// Returns `None` if `end < start`.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of blocks covered by the window.
    pub fn block_count(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn contains(&self, block: u64) -> bool {
        (self.start..=self.end).contains(&block)
    }
}

impl fmt::Display for BlockWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// A staking pool log entry for the tracked account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub block_number: u64,
    pub kind: EventKind,
    pub account: Address,
}

/// Raw `eth_feeHistory` data used for priority fee estimation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeeHistoryData {
    /// Base fee per block, including the block after the newest one in the range.
    pub base_fee_per_gas: Vec<u128>,
    /// Priority fee samples per block, one entry per requested percentile.
    pub reward: Vec<Vec<u128>>,
}

impl FeeHistoryData {
    /// Base fee of the newest block in the range, if the chain uses EIP-1559 pricing.
    pub fn latest_base_fee(&self) -> Option<u128> {
        let newest = match self.base_fee_per_gas.len() {
            0 => return None,
            1 => self.base_fee_per_gas[0],
            n => self.base_fee_per_gas[n - 2],
        };
        (newest > 0).then_some(newest)
    }
}

/// Fee fields applied to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePricing {
    Eip1559 { max_fee_per_gas: u128, max_priority_fee_per_gas: u128 },
    Legacy { gas_price: u128 },
}

/// Explicit transaction parameters used when resubmitting a rejected claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeOverrides {
    pub gas_limit: u64,
    pub nonce: u64,
    pub pricing: FeePricing,
}

impl FeeOverrides {
    pub fn apply(&self, tx: TransactionRequest) -> TransactionRequest {
        let tx = tx.with_gas_limit(self.gas_limit).with_nonce(self.nonce);
        match self.pricing {
            FeePricing::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } => tx
                .with_max_fee_per_gas(max_fee_per_gas)
                .with_max_priority_fee_per_gas(max_priority_fee_per_gas),
            FeePricing::Legacy { gas_price } => tx.with_gas_price(gas_price),
        }
    }
}

/// Which staking pool function a claim submits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ClaimMode {
    /// Compound pending rewards into the stake (`restakeRewards`).
    #[default]
    Restake,
    /// Withdraw pending rewards to the wallet (`claimPendingRewards`).
    Claim,
}

impl ClaimMode {
    pub fn function_name(self) -> &'static str {
        match self {
            Self::Restake => "restakeRewards",
            Self::Claim => "claimPendingRewards",
        }
    }
}

/// Outcome of a mined claim transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub block_number: Option<u64>,
    /// Sum of the `RewardClaimed` amounts emitted by the transaction.
    pub claimed: U256,
}

/// Capability interface over the remote staking ledger.
///
/// All operations may fail with [ChainError::Transport] or a classified [ChainError::Rpc].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Height of the current chain head.
    async fn current_height(&self) -> Result<u64, ChainError>;

    /// Wall-clock time at which the block at `height` was produced.
    async fn block_timestamp(&self, height: u64) -> Result<DateTime<Utc>, ChainError>;

    /// Logs of `kind` emitted for `account` within `window`.
    async fn query_logs(
        &self,
        window: BlockWindow,
        kind: EventKind,
        account: Address,
    ) -> Result<Vec<LogEvent>, ChainError>;

    /// Native token balance, used to pay for gas.
    async fn account_balance(&self, account: Address) -> Result<U256, ChainError>;

    /// Next nonce for `account`.
    async fn account_nonce(&self, account: Address) -> Result<u64, ChainError>;

    /// Rewards accrued by `account` that have not been claimed yet.
    async fn pending_rewards(&self, account: Address) -> Result<U256, ChainError>;

    /// The node's suggested legacy gas price.
    async fn gas_price(&self) -> Result<u128, ChainError>;

    /// Fee history for the `block_count` blocks up to and including the pending block.
    async fn fee_history(
        &self,
        block_count: u64,
        percentiles: &[f64],
    ) -> Result<FeeHistoryData, ChainError>;

    /// Sign and broadcast a claim from `account`. Without overrides the node fills in fees.
    async fn submit_claim(
        &self,
        account: Address,
        overrides: Option<FeeOverrides>,
    ) -> Result<TxHash, ChainError>;
}
