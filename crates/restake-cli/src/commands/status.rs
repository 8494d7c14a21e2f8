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

use alloy::primitives::{utils::format_ether, Address};
use anyhow::{Context, Result};
use axs_rewards::{
    format_wait, CooldownPolicy, Eligibility, Evaluator, ScanError, WindowScanner,
    CLAIM_LOOKBACK_DAYS,
};
use axs_staking::{ChainClient, EventKind};
use chrono::Utc;
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::config::GlobalConfig;

/// Command to report the claim status of an account.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct StatusCmd {
    /// Account to inspect. Defaults to the address of the configured private key.
    pub account: Option<Address>,

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
}

impl StatusCmd {
    /// Run the [StatusCmd] command.
    pub async fn run(
        &self,
        global_config: &GlobalConfig,
        cancel: &CancellationToken,
    ) -> Result<ExitCode> {
        let account = match self.account {
            Some(account) => account,
            None => global_config.require_private_key()?.address(),
        };
        let client = global_config.build_client().await?;
        let now = Utc::now();

        let balance = client.account_balance(account).await?;
        let staked = client.staked_amount(account).await?;
        let pending = client.pending_rewards(account).await?;
        tracing::info!("Account: {account}");
        tracing::info!("Balance: {} RON", format_ether(balance));
        tracing::info!("Staked: {} AXS", format_ether(staked));
        tracing::info!("Pending rewards: {} AXS", format_ether(pending));

        let logs = match WindowScanner::new(&client)
            .with_cancellation(cancel.clone())
            .scan(account, &EventKind::ALL, self.lookback_days, now)
            .await
        {
            Ok(logs) => logs,
            Err(ScanError::Cancelled) => {
                tracing::warn!("Interrupted while scanning events");
                return Ok(ExitCode::FAILURE);
            }
            Err(err) => return Err(err).context("Failed to scan staking pool events"),
        };
        let evaluator = Evaluator::new(self.cooldown_policy);
        let snapshot = evaluator.evaluate(&client, logs.staked(), logs.claimed()).await?;

        let describe = |at: Option<chrono::DateTime<Utc>>| match at {
            Some(at) => at.to_rfc3339(),
            None => format!("none in the last {} days", self.lookback_days),
        };
        tracing::info!("Last stake: {}", describe(snapshot.last_stake_at));
        tracing::info!("Last claim: {}", describe(snapshot.last_claim_at));

        match evaluator.decide(&snapshot, now) {
            Eligibility::Eligible => tracing::info!("Eligible to claim now"),
            Eligibility::Cooldown { next_eligible_at, .. } => tracing::info!(
                "Please wait until {} or another {}",
                next_eligible_at.to_rfc3339(),
                format_wait(next_eligible_at - now)
            ),
        }
        Ok(ExitCode::SUCCESS)
    }
}
