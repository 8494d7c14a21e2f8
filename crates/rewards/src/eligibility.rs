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

//! Claim eligibility derived from the most recent stake and claim events.

use axs_staking::{ChainClient, ChainError, LogEvent};
use chrono::{DateTime, TimeDelta, Utc};

use crate::COOLDOWN_HOURS;

/// Which events restart the claim cooldown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CooldownPolicy {
    /// Both stakes and claims restart the cooldown.
    #[default]
    AnyEvent,
    /// Only claims restart the cooldown.
    ClaimOnly,
}

/// A [LogEvent] with the timestamp of the block that contains it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampedEvent {
    pub event: LogEvent,
    pub timestamp: DateTime<Utc>,
}

impl TimestampedEvent {
    /// Resolve the timestamp of the highest-block event in `events`.
    pub async fn latest<C: ChainClient + ?Sized>(
        client: &C,
        events: &[LogEvent],
    ) -> Result<Option<Self>, ChainError> {
        let Some(event) = events.iter().max_by_key(|event| event.block_number) else {
            return Ok(None);
        };
        let timestamp = client.block_timestamp(event.block_number).await?;
        Ok(Some(Self { event: event.clone(), timestamp }))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EligibilitySnapshot {
    pub last_stake_at: Option<DateTime<Utc>>,
    pub last_claim_at: Option<DateTime<Utc>>,
}

/// Result of evaluating a snapshot at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Cooldown { last_event_at: DateTime<Utc>, next_eligible_at: DateTime<Utc> },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Decides whether a claim may be submitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    policy: CooldownPolicy,
}

impl Evaluator {
    pub fn new(policy: CooldownPolicy) -> Self {
        Self { policy }
    }

    pub fn cooldown() -> TimeDelta {
        TimeDelta::hours(COOLDOWN_HOURS)
    }

    /// Build a snapshot from the scanned events by resolving the timestamps of the latest
    /// stake and the latest claim.
    pub async fn evaluate<C: ChainClient + ?Sized>(
        &self,
        client: &C,
        staked: &[LogEvent],
        claimed: &[LogEvent],
    ) -> Result<EligibilitySnapshot, ChainError> {
        let last_stake = TimestampedEvent::latest(client, staked).await?;
        let last_claim = TimestampedEvent::latest(client, claimed).await?;
        if let Some(stake) = &last_stake {
            let block = stake.event.block_number;
            tracing::info!(block, "Last stake event at {}", stake.timestamp);
        }
        if let Some(claim) = &last_claim {
            let block = claim.event.block_number;
            tracing::info!(block, "Last claim event at {}", claim.timestamp);
        }
        Ok(EligibilitySnapshot {
            last_stake_at: last_stake.map(|e| e.timestamp),
            last_claim_at: last_claim.map(|e| e.timestamp),
        })
    }

    /// The most recent event that restarts the cooldown under this policy.
    pub fn last_event_at(&self, snapshot: &EligibilitySnapshot) -> Option<DateTime<Utc>> {
        match self.policy {
            CooldownPolicy::AnyEvent => snapshot.last_stake_at.max(snapshot.last_claim_at),
            CooldownPolicy::ClaimOnly => snapshot.last_claim_at,
        }
    }

    pub fn decide(&self, snapshot: &EligibilitySnapshot, now: DateTime<Utc>) -> Eligibility {
        let Some(last_event_at) = self.last_event_at(snapshot) else {
            return Eligibility::Eligible;
        };
        let next_eligible_at = last_event_at + Self::cooldown();
        if now >= next_eligible_at {
            Eligibility::Eligible
        } else {
            Eligibility::Cooldown { last_event_at, next_eligible_at }
        }
    }

    pub fn can_claim(&self, snapshot: &EligibilitySnapshot, now: DateTime<Utc>) -> bool {
        self.decide(snapshot, now).is_eligible()
    }
}

/// Render a wait as `{h} hrs {m}m {s}s`. Negative durations render as zero.
pub fn format_wait(wait: TimeDelta) -> String {
    let secs = wait.num_seconds().max(0);
    format!("{} hrs {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
