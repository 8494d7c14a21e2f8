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

use std::{collections::VecDeque, sync::Mutex};

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use axs_staking::{
    BlockWindow, ChainClient, ChainError, EventKind, FeeHistoryData, FeeOverrides, LogEvent,
};
use chrono::{DateTime, TimeDelta, Utc};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Calls {
    windows: Vec<(BlockWindow, EventKind)>,
    submissions: Vec<Option<FeeOverrides>>,
    fee_history: Vec<u64>,
}

/// A chain with a fixed head whose blocks are produced at a constant interval ending at `now`.
///
/// Block `h` has timestamp `now - (head - h) * block_time`. Blocks above the head are missing.
pub struct MockChainClient {
    head: u64,
    now: DateTime<Utc>,
    block_time: TimeDelta,
    logs: Vec<LogEvent>,
    balance: U256,
    pending_rewards: U256,
    nonce: u64,
    gas_price: Option<u128>,
    fee_history: Option<FeeHistoryData>,
    submit_results: Mutex<VecDeque<Result<TxHash, ChainError>>>,
    cancel_after: Option<(CancellationToken, usize)>,
    calls: Mutex<Calls>,
}

impl MockChainClient {
    pub fn new(head: u64, now: DateTime<Utc>) -> Self {
        Self {
            head,
            now,
            block_time: TimeDelta::seconds(3),
            logs: Vec::new(),
            balance: U256::ZERO,
            pending_rewards: U256::ZERO,
            nonce: 0,
            gas_price: Some(1_000_000_000),
            fee_history: Some(FeeHistoryData::default()),
            submit_results: Mutex::new(VecDeque::new()),
            cancel_after: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn with_block_time(self, block_time: TimeDelta) -> Self {
        Self { block_time, ..self }
    }

    /// Events returned by `query_logs`, in the order they should be fetched.
    pub fn with_logs(self, logs: Vec<LogEvent>) -> Self {
        Self { logs, ..self }
    }

    pub fn with_balance(self, balance: U256) -> Self {
        Self { balance, ..self }
    }

    pub fn with_pending_rewards(self, pending_rewards: U256) -> Self {
        Self { pending_rewards, ..self }
    }

    pub fn with_nonce(self, nonce: u64) -> Self {
        Self { nonce, ..self }
    }

    /// Gas price returned by `gas_price`. `None` makes the query fail.
    pub fn with_gas_price(self, gas_price: Option<u128>) -> Self {
        Self { gas_price, ..self }
    }

    /// Fee history returned by `fee_history`. `None` makes the query fail.
    pub fn with_fee_history(self, fee_history: Option<FeeHistoryData>) -> Self {
        Self { fee_history, ..self }
    }

    /// Results returned by successive `submit_claim` calls. Once exhausted, submissions fail.
    pub fn with_submit_results(self, results: Vec<Result<TxHash, ChainError>>) -> Self {
        Self { submit_results: Mutex::new(results.into()), ..self }
    }

    /// Fire `cancel` once `queries` calls to `query_logs` have completed.
    pub fn cancel_after_queries(self, cancel: CancellationToken, queries: usize) -> Self {
        Self { cancel_after: Some((cancel, queries)), ..self }
    }

    pub fn timestamp_of(&self, height: u64) -> Option<DateTime<Utc>> {
        let depth = i32::try_from(self.head.checked_sub(height)?).ok()?;
        Some(self.now - self.block_time * depth)
    }

    /// Windows passed to `query_logs`, in call order.
    pub fn queried_windows(&self) -> Vec<(BlockWindow, EventKind)> {
        self.calls.lock().unwrap().windows.clone()
    }

    pub fn query_logs_calls(&self) -> usize {
        self.calls.lock().unwrap().windows.len()
    }

    /// Overrides passed to `submit_claim`, in call order.
    pub fn submissions(&self) -> Vec<Option<FeeOverrides>> {
        self.calls.lock().unwrap().submissions.clone()
    }

    /// Block counts passed to `fee_history`, in call order.
    pub fn fee_history_requests(&self) -> Vec<u64> {
        self.calls.lock().unwrap().fee_history.clone()
    }
}

fn scripted_failure(what: &str) -> ChainError {
    ChainError::Transport(format!("mock: {what} not available"))
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn current_height(&self) -> Result<u64, ChainError> {
        Ok(self.head)
    }

    async fn block_timestamp(&self, height: u64) -> Result<DateTime<Utc>, ChainError> {
        self.timestamp_of(height).ok_or(ChainError::MissingBlock(height))
    }

    async fn query_logs(
        &self,
        window: BlockWindow,
        kind: EventKind,
        account: Address,
    ) -> Result<Vec<LogEvent>, ChainError> {
        let queries = {
            let mut calls = self.calls.lock().unwrap();
            calls.windows.push((window, kind));
            calls.windows.len()
        };
        if let Some((cancel, after)) = &self.cancel_after {
            if queries >= *after {
                cancel.cancel();
            }
        }
        Ok(self
            .logs
            .iter()
            .filter(|log| {
                log.kind == kind && log.account == account && window.contains(log.block_number)
            })
            .cloned()
            .collect())
    }

    async fn account_balance(&self, _account: Address) -> Result<U256, ChainError> {
        Ok(self.balance)
    }

    async fn account_nonce(&self, _account: Address) -> Result<u64, ChainError> {
        Ok(self.nonce)
    }

    async fn pending_rewards(&self, _account: Address) -> Result<U256, ChainError> {
        Ok(self.pending_rewards)
    }

    async fn gas_price(&self) -> Result<u128, ChainError> {
        self.gas_price.ok_or_else(|| scripted_failure("gas price"))
    }

    async fn fee_history(
        &self,
        block_count: u64,
        _percentiles: &[f64],
    ) -> Result<FeeHistoryData, ChainError> {
        self.calls.lock().unwrap().fee_history.push(block_count);
        self.fee_history.clone().ok_or_else(|| scripted_failure("fee history"))
    }

    async fn submit_claim(
        &self,
        _account: Address,
        overrides: Option<FeeOverrides>,
    ) -> Result<TxHash, ChainError> {
        self.calls.lock().unwrap().submissions.push(overrides);
        self.submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(scripted_failure("submit result")))
    }
}
