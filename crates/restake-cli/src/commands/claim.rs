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

use std::process::ExitCode;

use alloy::primitives::utils::format_ether;
use anyhow::{Context, Result};
use axs_rewards::{
    ClaimConfig, ClaimOutcome, Claimer, CooldownPolicy, RunError, CLAIM_GAS_LIMIT,
    CLAIM_LOOKBACK_DAYS,
};
use axs_staking::ClaimMode;
use chrono::Utc;
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::config::GlobalConfig;

/// Command to claim or restake pending rewards.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct ClaimCmd {
    /// Whether to compound rewards into the stake or withdraw them to the wallet.
    #[clap(long, value_enum, env = "CLAIM_MODE", default_value_t = ClaimMode::Restake)]
    pub mode: ClaimMode,

    /// Which events restart the claim cooldown.
    #[clap(long, value_enum, default_value_t = CooldownPolicy::AnyEvent)]
    pub cooldown_policy: CooldownPolicy,

    /// Days of history scanned for stake and claim events.
    #[clap(
        long,
        default_value_t = CLAIM_LOOKBACK_DAYS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub lookback_days: u64,

    /// Return once the transaction is sent, without waiting for the receipt.
    #[clap(long)]
    pub no_wait: bool,
}

impl ClaimCmd {
    /// Run the [ClaimCmd] command.
    pub async fn run(
        &self,
        global_config: &GlobalConfig,
        cancel: &CancellationToken,
    ) -> Result<ExitCode> {
        let (client, account) = global_config.build_client_with_signer(self.mode).await?;
        tracing::info!(
            %account,
            staking_pool = %client.staking_pool(),
            mode = ?self.mode,
            "Starting claim"
        );

        let config = ClaimConfig {
            lookback_days: self.lookback_days,
            policy: self.cooldown_policy,
            gas_limit: CLAIM_GAS_LIMIT,
            ..Default::default()
        };
        let outcome = match Claimer::new(&client, account, config)
            .with_cancellation(cancel.clone())
            .run(Utc::now())
            .await
        {
            Ok(outcome) => outcome,
            Err(RunError::Cancelled) => {
                tracing::warn!("Interrupted before submitting a claim");
                return Ok(ExitCode::FAILURE);
            }
            Err(err) => return Err(err).context("Claim run aborted"),
        };

        let (tx_hash, pending_rewards) = match outcome {
            ClaimOutcome::Succeeded { tx_hash, pending_rewards, repriced } => {
                let function = self.mode.function_name();
                tracing::info!(%tx_hash, repriced, "Sent {function}() transaction");
                (tx_hash, pending_rewards)
            }
            ClaimOutcome::Failed(failure) if failure.is_expected() => {
                tracing::info!("{failure}");
                return Ok(ExitCode::FAILURE);
            }
            ClaimOutcome::Failed(failure) => {
                tracing::error!(?failure, "{failure}");
                return Ok(ExitCode::FAILURE);
            }
        };

        if self.no_wait {
            return Ok(ExitCode::SUCCESS);
        }

        let receipt = client
            .confirm(tx_hash, Some(global_config.tx_timeout()))
            .await
            .with_context(|| format!("Failed to confirm transaction {tx_hash}"))?;
        if !receipt.success {
            tracing::error!(
                %tx_hash,
                block = ?receipt.block_number,
                "{}() transaction reverted",
                self.mode.function_name()
            );
            return Ok(ExitCode::FAILURE);
        }

        let claimed = if receipt.claimed.is_zero() { pending_rewards } else { receipt.claimed };
        tracing::info!(
            %tx_hash,
            block = ?receipt.block_number,
            "Claimed rewards: {} AXS",
            format_ether(claimed)
        );
        Ok(ExitCode::SUCCESS)
    }
}
