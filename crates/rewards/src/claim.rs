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

//! The claim workflow: balance and reward checks, cooldown evaluation, and submission with a
//! single repriced retry when the node rejects the transaction as underpriced.

use std::fmt;

use alloy::primitives::{Address, TxHash, U256};
use axs_staking::{ChainClient, ChainError, EventKind, FeeOverrides};
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    eligibility::{format_wait, CooldownPolicy, Eligibility, Evaluator},
    fees::{FeeEstimator, FeeQuote, FEE_HISTORY_BLOCKS},
    scanner::{ScanError, WindowScanner},
    CLAIM_GAS_LIMIT, CLAIM_LOOKBACK_DAYS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimState {
    Idle,
    BalanceChecked,
    RewardsChecked,
    EligibilityChecked,
    Submitting,
    UnderpricedRetry,
    Succeeded,
    Failed,
}

impl fmt::Display for ClaimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Terminal reasons for a run that did not submit a claim successfully.
///
/// These are expected outcomes and are returned as [ClaimOutcome::Failed], not as errors.
#[derive(Error, Debug)]
pub enum ClaimFailure {
    #[error("account {account} has no balance to pay for gas")]
    EmptyBalance { account: Address },

    #[error("account {account} has no pending rewards")]
    NoPendingRewards { account: Address },

    #[error(
        "cooldown active since {last_event_at}. Please wait until {next_eligible_at} or another {}",
        format_wait(.remaining.to_owned())
    )]
    CooldownActive {
        last_event_at: DateTime<Utc>,
        next_eligible_at: DateTime<Utc>,
        remaining: TimeDelta,
    },

    #[error("failed to submit claim: {0}")]
    SubmissionError(#[source] ChainError),

    #[error("repriced claim failed after an underpriced rejection: {0}")]
    UnderpricedRetryFailed(#[source] ChainError),

    #[error("insufficient funds to submit claim: {0}")]
    InsufficientFunds(#[source] ChainError),
}

impl ClaimFailure {
    /// Whether this outcome is part of normal operation rather than a fault.
    pub fn is_expected(&self) -> bool {
        matches!(self, Self::NoPendingRewards { .. } | Self::CooldownActive { .. })
    }
}

#[derive(Debug)]
pub enum ClaimOutcome {
    Succeeded {
        tx_hash: TxHash,
        pending_rewards: U256,
        /// Whether the claim went through on the repriced retry.
        repriced: bool,
    },
    Failed(ClaimFailure),
}

impl ClaimOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            Self::Succeeded { tx_hash, .. } => Some(*tx_hash),
            Self::Failed(_) => None,
        }
    }
}

/// Failures that abort a run before a terminal state is reached.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("event scan failed: {0}")]
    Scan(ScanError),

    #[error("claim run cancelled before submission")]
    Cancelled,
}

impl From<ScanError> for RunError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Cancelled => Self::Cancelled,
            ScanError::Chain(err) => Self::Chain(err),
            other => Self::Scan(other),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ClaimConfig {
    pub lookback_days: u64,
    pub policy: CooldownPolicy,
    pub gas_limit: u64,
    pub fee_history_blocks: u64,
}

impl Default for ClaimConfig {
    fn default() -> Self {
        Self {
            lookback_days: CLAIM_LOOKBACK_DAYS,
            policy: CooldownPolicy::default(),
            gas_limit: CLAIM_GAS_LIMIT,
            fee_history_blocks: FEE_HISTORY_BLOCKS,
        }
    }
}

/// Drives one claim attempt for `account`.
pub struct Claimer<'a, C: ?Sized> {
    client: &'a C,
    account: Address,
    config: ClaimConfig,
    state: ClaimState,
    cancel: CancellationToken,
}

impl<'a, C: ChainClient + ?Sized> Claimer<'a, C> {
    pub fn new(client: &'a C, account: Address, config: ClaimConfig) -> Self {
        Self { client, account, config, state: ClaimState::Idle, cancel: CancellationToken::new() }
    }

    /// Abort with [RunError::Cancelled] at the next request boundary once `cancel` fires.
    ///
    /// Cancellation is only observed before submission. Once a claim has been sent the run
    /// completes, so the transaction hash is always reported.
    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self }
    }

    fn ensure_not_cancelled(&self) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            tracing::warn!(state = %self.state, "Claim run cancelled");
            return Err(RunError::Cancelled);
        }
        Ok(())
    }

    pub fn state(&self) -> ClaimState {
        self.state
    }

    fn transition(&mut self, next: ClaimState) {
        tracing::debug!(from = %self.state, to = %next, "Claim state transition");
        self.state = next;
    }

    fn fail(&mut self, failure: ClaimFailure) -> ClaimOutcome {
        self.transition(ClaimState::Failed);
        ClaimOutcome::Failed(failure)
    }

    /// Run the workflow to a terminal state.
    ///
    /// Chain and scan failures before submission abort the run with a [RunError]. Everything
    /// from submission onwards is reported through the returned [ClaimOutcome].
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<ClaimOutcome, RunError> {
        self.state = ClaimState::Idle;

        self.ensure_not_cancelled()?;
        let balance = self.client.account_balance(self.account).await?;
        tracing::info!(account = %self.account, %balance, "Checked account balance");
        if balance.is_zero() {
            return Ok(self.fail(ClaimFailure::EmptyBalance { account: self.account }));
        }
        self.transition(ClaimState::BalanceChecked);

        self.ensure_not_cancelled()?;
        let pending_rewards = self.client.pending_rewards(self.account).await?;
        tracing::info!(%pending_rewards, "Checked pending rewards");
        if pending_rewards.is_zero() {
            return Ok(self.fail(ClaimFailure::NoPendingRewards { account: self.account }));
        }
        self.transition(ClaimState::RewardsChecked);

        tracing::info!("Reading events...");
        let logs = WindowScanner::new(self.client)
            .with_cancellation(self.cancel.clone())
            .scan(self.account, &EventKind::ALL, self.config.lookback_days, now)
            .await?;
        tracing::info!(
            staked = logs.staked().len(),
            claimed = logs.claimed().len(),
            "Found events in blocks {}",
            logs.range()
        );

        self.ensure_not_cancelled()?;
        let evaluator = Evaluator::new(self.config.policy);
        let snapshot = evaluator.evaluate(self.client, logs.staked(), logs.claimed()).await?;
        if let Eligibility::Cooldown { last_event_at, next_eligible_at } =
            evaluator.decide(&snapshot, now)
        {
            return Ok(self.fail(ClaimFailure::CooldownActive {
                last_event_at,
                next_eligible_at,
                remaining: next_eligible_at - now,
            }));
        }
        self.transition(ClaimState::EligibilityChecked);

        self.ensure_not_cancelled()?;
        self.transition(ClaimState::Submitting);
        let tx_hash = match self.client.submit_claim(self.account, None).await {
            Ok(tx_hash) => tx_hash,
            Err(err) if err.is_underpriced() => {
                tracing::warn!(?err, "Claim rejected as underpriced, retrying with estimated fees");
                self.transition(ClaimState::UnderpricedRetry);
                return Ok(self.retry_repriced(pending_rewards).await);
            }
            Err(err) if err.is_insufficient_funds() => {
                return Ok(self.fail(ClaimFailure::InsufficientFunds(err)));
            }
            Err(err) => return Ok(self.fail(ClaimFailure::SubmissionError(err))),
        };

        tracing::info!(%tx_hash, "Claim submitted");
        self.transition(ClaimState::Succeeded);
        Ok(ClaimOutcome::Succeeded { tx_hash, pending_rewards, repriced: false })
    }

    async fn retry_repriced(&mut self, pending_rewards: U256) -> ClaimOutcome {
        let quote = match FeeEstimator::new(self.client)
            .with_block_count(self.config.fee_history_blocks)
            .estimate()
            .await
        {
            Ok(quote) => quote,
            Err(err) => {
                tracing::warn!(?err, "Fee estimation failed, using default gas price");
                FeeQuote::fallback()
            }
        };

        let nonce = match self.client.account_nonce(self.account).await {
            Ok(nonce) => nonce,
            Err(err) => return self.fail(ClaimFailure::UnderpricedRetryFailed(err)),
        };
        let overrides =
            FeeOverrides { gas_limit: self.config.gas_limit, nonce, pricing: quote.pricing() };
        tracing::info!(?overrides, "Resubmitting claim");

        self.transition(ClaimState::Submitting);
        match self.client.submit_claim(self.account, Some(overrides)).await {
            Ok(tx_hash) => {
                tracing::info!(%tx_hash, "Repriced claim submitted");
                self.transition(ClaimState::Succeeded);
                ClaimOutcome::Succeeded { tx_hash, pending_rewards, repriced: true }
            }
            Err(err) => self.fail(ClaimFailure::UnderpricedRetryFailed(err)),
        }
    }
}
