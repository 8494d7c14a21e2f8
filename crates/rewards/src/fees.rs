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

//! Fee estimation from recent priority fee samples.

use axs_staking::{ChainClient, ChainError, FeePricing};
use thiserror::Error;

/// Number of historical blocks sampled, excluding the pending block.
pub const FEE_HISTORY_BLOCKS: u64 = 4;
/// Reward percentiles requested from `eth_feeHistory`. Only the first is used.
pub const FEE_HISTORY_PERCENTILES: [f64; 3] = [25.0, 50.0, 75.0];
/// Flat gas price used when no better estimate is available (20 gwei).
pub const DEFAULT_GAS_PRICE: u128 = 20_000_000_000;

#[derive(Error, Debug)]
pub enum FeeEstimationError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("fee history returned no priority fee samples")]
    EmptyHistory,
}

/// Estimated fee fields. Without a base fee only `legacy_gas_price` is meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeQuote {
    pub base_fee_per_gas: Option<u128>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub legacy_gas_price: Option<u128>,
}

impl FeeQuote {
    /// Quote used when estimation fails.
    pub fn fallback() -> Self {
        Self { legacy_gas_price: Some(DEFAULT_GAS_PRICE), ..Default::default() }
    }

    /// Fee fields to put on a transaction.
    pub fn pricing(&self) -> FeePricing {
        match (self.max_fee_per_gas, self.max_priority_fee_per_gas) {
            (Some(max_fee_per_gas), Some(max_priority_fee_per_gas)) => {
                FeePricing::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas }
            }
            _ => FeePricing::Legacy {
                gas_price: self.legacy_gas_price.unwrap_or(DEFAULT_GAS_PRICE),
            },
        }
    }
}

/// Mean of `samples`, rounded half up. `None` when there are no samples.
pub fn mean_priority_fee(samples: &[u128]) -> Option<u128> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as u128;
    let sum = samples.iter().fold(0u128, |acc, s| acc.saturating_add(*s));
    Some(sum.saturating_mul(2).saturating_add(n) / (2 * n))
}

pub struct FeeEstimator<'a, C: ?Sized> {
    client: &'a C,
    block_count: u64,
}

impl<'a, C: ChainClient + ?Sized> FeeEstimator<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client, block_count: FEE_HISTORY_BLOCKS }
    }

    pub fn with_block_count(self, block_count: u64) -> Self {
        Self { block_count: block_count.max(1), ..self }
    }

    pub async fn estimate(&self) -> Result<FeeQuote, FeeEstimationError> {
        // One extra row for the pending block, which is not sampled.
        let history =
            self.client.fee_history(self.block_count + 1, &FEE_HISTORY_PERCENTILES).await?;

        let quote = match history.latest_base_fee() {
            Some(base_fee) => {
                let samples: Vec<u128> = history
                    .reward
                    .iter()
                    .take(self.block_count as usize)
                    .filter_map(|row| row.first().copied())
                    .collect();
                let priority_fee =
                    mean_priority_fee(&samples).ok_or(FeeEstimationError::EmptyHistory)?;
                FeeQuote {
                    base_fee_per_gas: Some(base_fee),
                    max_fee_per_gas: Some(base_fee.saturating_mul(2).saturating_add(priority_fee)),
                    max_priority_fee_per_gas: Some(priority_fee),
                    legacy_gas_price: None,
                }
            }
            // Legacy chains only price by gas price; priority samples are not needed.
            None => {
                let gas_price = match self.client.gas_price().await {
                    Ok(price) => price,
                    Err(err) => {
                        tracing::warn!(?err, "Failed to query gas price, using default");
                        DEFAULT_GAS_PRICE
                    }
                };
                FeeQuote { legacy_gas_price: Some(gas_price), ..Default::default() }
            }
        };
        tracing::debug!(?quote, "Estimated fees");
        Ok(quote)
    }
}
