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

//! Paginated retrieval of staking pool events over a lookback period.
//!
//! The gateway rejects `eth_getLogs` requests spanning more than [MAX_WINDOW] blocks, and the
//! chain offers no "block at time T" lookup. The scanner first walks back from an estimated
//! block until it finds one old enough, then pages forward to the head in contiguous,
//! non-overlapping windows.

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::Address;
use axs_staking::{BlockWindow, ChainClient, ChainError, EventKind, LogEvent};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{APPROX_BLOCKS_PER_DAY, MAX_REFINEMENT_STEPS, MAX_WINDOW};

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("lookback must be at least one day")]
    ZeroLookback,

    #[error("chain height {height} is below the lookback offset of {offset} blocks")]
    HeightTooLow { height: u64, offset: u64 },

    #[error("reached genesis before finding a block at least {lookback_days} days old")]
    GenesisReached { lookback_days: u64 },

    #[error("no block at least {lookback_days} days old found within {steps} block lookups")]
    RefinementExhausted { lookback_days: u64, steps: u64 },

    #[error("scan start {start} is above the chain head {head}")]
    EmptyRange { start: u64, head: u64 },

    #[error("scan cancelled")]
    Cancelled,
}

/// Events collected by a scan, per kind, sorted ascending by block number.
#[derive(Debug, Clone)]
pub struct EventLogs {
    events: BTreeMap<EventKind, Vec<LogEvent>>,
    range: BlockWindow,
}

impl EventLogs {
    /// Events of `kind`. Empty if none were found or the kind was not scanned.
    pub fn of(&self, kind: EventKind) -> &[LogEvent] {
        self.events.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn staked(&self) -> &[LogEvent] {
        self.of(EventKind::Staked)
    }

    pub fn claimed(&self) -> &[LogEvent] {
        self.of(EventKind::Claimed)
    }

    /// The full block range covered by the scan.
    pub fn range(&self) -> BlockWindow {
        self.range
    }
}

/// Whole days elapsed between `then` and `now`, rounded down.
pub fn elapsed_days(now: DateTime<Utc>, then: DateTime<Utc>) -> i64 {
    (now - then).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Window scanner over a [ChainClient].
pub struct WindowScanner<'a, C: ?Sized> {
    client: &'a C,
    max_window: u64,
    blocks_per_day: u64,
    max_steps: u64,
    cancel: CancellationToken,
}

impl<'a, C: ChainClient + ?Sized> WindowScanner<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            max_window: MAX_WINDOW,
            blocks_per_day: APPROX_BLOCKS_PER_DAY,
            max_steps: MAX_REFINEMENT_STEPS,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the number of blocks per request. Values below one are clamped to one.
    pub fn with_max_window(self, max_window: u64) -> Self {
        Self { max_window: max_window.max(1), ..self }
    }

    pub fn with_blocks_per_day(self, blocks_per_day: u64) -> Self {
        Self { blocks_per_day, ..self }
    }

    pub fn with_max_steps(self, max_steps: u64) -> Self {
        Self { max_steps, ..self }
    }

    /// Stop with [ScanError::Cancelled] before the next request once `cancel` fires. A request
    /// already in flight is allowed to complete.
    pub fn with_cancellation(self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self }
    }

    fn ensure_not_cancelled(&self) -> Result<(), ScanError> {
        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }

    /// Collect events of each of `kinds` emitted for `account` from a block at least
    /// `lookback_days` old up to the current head.
    pub async fn scan(
        &self,
        account: Address,
        kinds: &[EventKind],
        lookback_days: u64,
        now: DateTime<Utc>,
    ) -> Result<EventLogs, ScanError> {
        self.ensure_not_cancelled()?;
        let head = self.client.current_height().await?;
        tracing::info!("Finding block numbers...");
        let start = self.find_start_block(head, lookback_days, now).await?;
        tracing::info!(
            "Querying events from block {} to {} ({} blocks)...",
            start,
            head,
            head - start + 1
        );
        self.collect(account, kinds, start, head).await
    }

    /// Locate a block whose age is at least `lookback_days`, starting from an estimate based
    /// on the expected block time.
    ///
    /// The result is tight to within one window: the block [Self::with_max_window] blocks
    /// later is younger than `lookback_days`, unless the head is reached first.
    pub async fn find_start_block(
        &self,
        head: u64,
        lookback_days: u64,
        now: DateTime<Utc>,
    ) -> Result<u64, ScanError> {
        if lookback_days == 0 {
            return Err(ScanError::ZeroLookback);
        }
        let offset = self.blocks_per_day.saturating_mul(lookback_days);
        let mut cursor =
            head.checked_sub(offset).ok_or(ScanError::HeightTooLow { height: head, offset })?;

        let mut steps = 0;
        let mut stepped_back = false;
        while steps < self.max_steps {
            steps += 1;
            if self.is_old_enough(cursor, lookback_days, now).await? {
                if stepped_back {
                    return Ok(cursor);
                }
                // The estimate overshot; walk forward while the next window is still old enough.
                while steps < self.max_steps {
                    let Some(next) = cursor.checked_add(self.max_window).filter(|n| *n <= head)
                    else {
                        break;
                    };
                    steps += 1;
                    if !self.is_old_enough(next, lookback_days, now).await? {
                        break;
                    }
                    cursor = next;
                }
                return Ok(cursor);
            }
            if cursor == 0 {
                return Err(ScanError::GenesisReached { lookback_days });
            }
            cursor = cursor.saturating_sub(self.max_window);
            stepped_back = true;
        }
        Err(ScanError::RefinementExhausted { lookback_days, steps })
    }

    async fn is_old_enough(
        &self,
        block: u64,
        lookback_days: u64,
        now: DateTime<Utc>,
    ) -> Result<bool, ScanError> {
        self.ensure_not_cancelled()?;
        let timestamp = self.client.block_timestamp(block).await?;
        let age = elapsed_days(now, timestamp);
        tracing::debug!(block, %timestamp, age_days = age, "Checked block age");
        Ok(age >= 0 && age as u64 >= lookback_days)
    }

    async fn collect(
        &self,
        account: Address,
        kinds: &[EventKind],
        start: u64,
        head: u64,
    ) -> Result<EventLogs, ScanError> {
        let range = BlockWindow::new(start, head).ok_or(ScanError::EmptyRange { start, head })?;
        let kinds: BTreeSet<EventKind> = kinds.iter().copied().collect();
        let mut events: BTreeMap<EventKind, Vec<LogEvent>> =
            kinds.iter().map(|kind| (*kind, Vec::new())).collect();

        let mut window_start = start;
        while window_start <= head {
            let window_end = window_start.saturating_add(self.max_window - 1).min(head);
            let Some(window) = BlockWindow::new(window_start, window_end) else {
                break;
            };
            for kind in &kinds {
                self.ensure_not_cancelled()?;
                let logs = self.client.query_logs(window, *kind, account).await?;
                tracing::debug!(%window, %kind, count = logs.len(), "Queried window");
                events.entry(*kind).or_default().extend(logs);
            }
            let Some(next) = window_end.checked_add(1) else {
                break;
            };
            window_start = next;
        }

        // Stable sort, so events within one block keep their fetch order.
        for logs in events.values_mut() {
            logs.sort_by_key(|event| event.block_number);
        }

        Ok(EventLogs { events, range })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use axs_test_utils::MockChainClient;
    use chrono::TimeDelta;
    use tracing_test::traced_test;

    use super::*;

    const ACCOUNT: Address = address!("0x00000000000000000000000000000000000000aa");
    const OTHER: Address = address!("0x00000000000000000000000000000000000000bb");

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_760_000_000, 0).unwrap()
    }

    fn event(block_number: u64, kind: EventKind) -> LogEvent {
        LogEvent { block_number, kind, account: ACCOUNT }
    }

    #[tokio::test]
    async fn windows_are_contiguous_and_bounded() {
        let client = MockChainClient::new(100_000, now());
        let scanner = WindowScanner::new(&client);
        let logs = scanner.scan(ACCOUNT, &[EventKind::Staked], 1, now()).await.unwrap();

        let windows = client.queried_windows();
        assert!(!windows.is_empty());
        assert_eq!(windows[0].0.start(), logs.range().start());
        assert_eq!(windows.last().unwrap().0.end(), 100_000);
        for (window, _) in &windows {
            assert!(window.end() - window.start() < MAX_WINDOW);
        }
        for pair in windows.windows(2) {
            assert_eq!(pair[0].0.end() + 1, pair[1].0.start());
        }
    }

    #[tokio::test]
    async fn final_window_at_exact_boundary_still_runs() {
        // With a 10 block window starting at 0, the head at 20 begins a new window.
        let client = MockChainClient::new(20, now()).with_block_time(TimeDelta::days(1));
        let scanner = WindowScanner::new(&client).with_max_window(10).with_blocks_per_day(1);
        let logs = scanner.scan(ACCOUNT, &[EventKind::Claimed], 20, now()).await.unwrap();

        assert_eq!(logs.range().start(), 0);
        let windows: Vec<_> = client.queried_windows().into_iter().map(|(w, _)| w).collect();
        assert_eq!(
            windows,
            vec![
                BlockWindow::new(0, 9).unwrap(),
                BlockWindow::new(10, 19).unwrap(),
                BlockWindow::new(20, 20).unwrap(),
            ]
        );
    }

    #[tokio::test]
    async fn output_is_sorted_without_duplicates() {
        let head = 100_000;
        let start_of_scan = head - 2 * APPROX_BLOCKS_PER_DAY;
        let client = MockChainClient::new(head, now()).with_logs(vec![
            event(start_of_scan + 1_200, EventKind::Staked),
            event(start_of_scan + 499, EventKind::Claimed),
            event(start_of_scan + 500, EventKind::Claimed),
            event(start_of_scan + 10, EventKind::Staked),
            LogEvent { block_number: start_of_scan + 20, kind: EventKind::Staked, account: OTHER },
            event(head, EventKind::Claimed),
        ]);
        let logs = WindowScanner::new(&client)
            .scan(ACCOUNT, &EventKind::ALL, 2, now())
            .await
            .unwrap();

        let staked: Vec<u64> = logs.staked().iter().map(|e| e.block_number).collect();
        let claimed: Vec<u64> = logs.claimed().iter().map(|e| e.block_number).collect();
        assert_eq!(staked, vec![start_of_scan + 10, start_of_scan + 1_200]);
        assert_eq!(claimed, vec![start_of_scan + 499, start_of_scan + 500, head]);
    }

    #[tokio::test]
    async fn missing_kinds_are_empty() {
        let client = MockChainClient::new(100_000, now());
        let logs = WindowScanner::new(&client)
            .scan(ACCOUNT, &[EventKind::Staked], 1, now())
            .await
            .unwrap();
        assert!(logs.staked().is_empty());
        assert!(logs.claimed().is_empty());
        assert!(client.queried_windows().iter().all(|(_, kind)| *kind == EventKind::Staked));
    }

    #[tokio::test]
    async fn refinement_result_is_tight() {
        // 2 second blocks make the estimate too recent, 4 second blocks make it too old.
        let head = 200_000;
        for block_secs in [2, 3, 4] {
            let client = MockChainClient::new(head, now())
                .with_block_time(TimeDelta::seconds(block_secs));
            let scanner = WindowScanner::new(&client);
            for lookback in 1..=3 {
                let start = scanner.find_start_block(head, lookback, now()).await.unwrap();
                let age = elapsed_days(now(), client.timestamp_of(start).unwrap());
                let next_age =
                    elapsed_days(now(), client.timestamp_of(start + MAX_WINDOW).unwrap());
                assert!(age >= lookback as i64, "{block_secs}s/{lookback}d: age {age}");
                assert!(next_age < lookback as i64, "{block_secs}s/{lookback}d: next {next_age}");
            }
        }
    }

    #[tokio::test]
    async fn overshooting_estimate_walks_forward() {
        let head = 200_000;
        let client = MockChainClient::new(head, now()).with_block_time(TimeDelta::seconds(4));
        let start = WindowScanner::new(&client).find_start_block(head, 1, now()).await.unwrap();

        let age = elapsed_days(now(), client.timestamp_of(start).unwrap());
        let next_age = elapsed_days(now(), client.timestamp_of(start + MAX_WINDOW).unwrap());
        assert_eq!(age, 1);
        assert_eq!(next_age, 0);
        assert!(start > head - APPROX_BLOCKS_PER_DAY);
    }

    #[tokio::test]
    async fn short_chain_is_a_scan_error() {
        let client = MockChainClient::new(1_000, now());
        let err = WindowScanner::new(&client).scan(ACCOUNT, &EventKind::ALL, 1, now()).await;
        assert!(matches!(err, Err(ScanError::HeightTooLow { height: 1_000, offset: 28_800 })));
        assert!(client.queried_windows().is_empty());
    }

    #[tokio::test]
    async fn genesis_is_a_scan_error() {
        // Every block is younger than a day, so the walk back hits block zero.
        let client = MockChainClient::new(30_000, now()).with_block_time(TimeDelta::seconds(1));
        let err = WindowScanner::new(&client).find_start_block(30_000, 1, now()).await;
        assert!(matches!(err, Err(ScanError::GenesisReached { lookback_days: 1 })));
    }

    #[tokio::test]
    async fn refinement_is_capped() {
        let client = MockChainClient::new(100_000, now()).with_block_time(TimeDelta::seconds(1));
        let err =
            WindowScanner::new(&client).with_max_steps(3).find_start_block(100_000, 1, now()).await;
        assert!(matches!(err, Err(ScanError::RefinementExhausted { steps: 3, .. })));
    }

    #[tokio::test]
    async fn zero_lookback_is_rejected() {
        let client = MockChainClient::new(100_000, now());
        let err = WindowScanner::new(&client).find_start_block(100_000, 0, now()).await;
        assert!(matches!(err, Err(ScanError::ZeroLookback)));
    }

    #[tokio::test]
    async fn start_above_head_is_an_empty_range() {
        let client = MockChainClient::new(100, now());
        let err = WindowScanner::new(&client).collect(ACCOUNT, &EventKind::ALL, 101, 100).await;
        assert!(matches!(err, Err(ScanError::EmptyRange { start: 101, head: 100 })));
        assert!(client.queried_windows().is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_between_windows() {
        let cancel = CancellationToken::new();
        let client = MockChainClient::new(100_000, now()).cancel_after_queries(cancel.clone(), 3);
        let err = WindowScanner::new(&client)
            .with_cancellation(cancel)
            .scan(ACCOUNT, &EventKind::ALL, 1, now())
            .await;

        assert!(matches!(err, Err(ScanError::Cancelled)));
        // The query that triggered cancellation completes, nothing after it is sent.
        assert_eq!(client.queried_windows().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_scan_sends_no_requests() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = MockChainClient::new(100_000, now());
        let err = WindowScanner::new(&client)
            .with_cancellation(cancel)
            .find_start_block(100_000, 1, now())
            .await;
        assert!(matches!(err, Err(ScanError::Cancelled)));
    }

    #[tokio::test]
    #[traced_test]
    async fn logs_scan_progress() {
        let client = MockChainClient::new(100_000, now());
        WindowScanner::new(&client).scan(ACCOUNT, &EventKind::ALL, 1, now()).await.unwrap();
        assert!(logs_contain("Finding block numbers..."));
        assert!(logs_contain("Querying events"));
    }

    #[test]
    fn elapsed_days_rounds_down() {
        let then = now() - TimeDelta::hours(47);
        assert_eq!(elapsed_days(now(), then), 1);
        assert_eq!(elapsed_days(now(), now() - TimeDelta::hours(48)), 2);
        assert_eq!(elapsed_days(now(), now() + TimeDelta::hours(1)), -1);
    }
}
