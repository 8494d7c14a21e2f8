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

//! Reconstructs the reward cooldown of a staking account from historical pool events and
//! submits reward claims once it has elapsed.

pub mod claim;
pub mod eligibility;
pub mod fees;
pub mod scanner;

pub use claim::{ClaimConfig, ClaimFailure, ClaimOutcome, ClaimState, Claimer, RunError};
pub use eligibility::{
    format_wait, CooldownPolicy, Eligibility, EligibilitySnapshot, Evaluator, TimestampedEvent,
};
pub use fees::{mean_priority_fee, FeeEstimationError, FeeEstimator, FeeQuote};
pub use scanner::{EventLogs, ScanError, WindowScanner};

/// Maximum number of blocks the RPC gateway accepts in a single `eth_getLogs` request.
pub const MAX_WINDOW: u64 = 500;
/// Approximate number of Ronin blocks per day, at a three second block time.
pub const APPROX_BLOCKS_PER_DAY: u64 = 28_800;
/// Days of history scanned before a claim. Covers the cooldown plus slack for the scan.
pub const CLAIM_LOOKBACK_DAYS: u64 = 2;
/// Hours that must pass after a stake or claim before the next claim.
pub const COOLDOWN_HOURS: i64 = 24;
/// Upper bound on block timestamp lookups while locating the scan start.
pub const MAX_REFINEMENT_STEPS: u64 = 10_000;
/// Gas limit used for repriced claim transactions.
pub const CLAIM_GAS_LIMIT: u64 = 300_000;
