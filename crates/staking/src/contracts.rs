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

//! Smart contract interface of the AXS staking pool.

use alloy::{
    rpc::types::{Log, TransactionReceipt},
    sol_types::SolEvent,
};

use crate::ChainError;

alloy::sol! {
    #[sol(rpc, all_derives)]
    interface IAxsStaking {
        event Staked(address indexed user, uint256 amount);
        event Unstaked(address indexed user, uint256 amount);
        event RewardClaimed(address indexed user, uint256 amount);

        function getStakingAmount(address user) external view returns (uint256);
        function getPendingRewards(address user) external view returns (uint256);
        function restakeRewards() external;
        function claimPendingRewards() external;
    }
}

/// Decode every log of type `E` emitted in the given receipt.
///
/// Logs with a different signature are skipped. An empty result is not an error, since a
/// restake does not always emit a claim event.
pub fn extract_tx_logs<E: SolEvent>(
    receipt: &TransactionReceipt,
) -> Result<Vec<Log<E>>, ChainError> {
    receipt
        .inner
        .logs()
        .iter()
        .filter_map(|log| {
            if log.topic0().map(|topic| E::SIGNATURE_HASH == *topic).unwrap_or(false) {
                Some(log.log_decode::<E>().map_err(|e| {
                    ChainError::Decode(format!("failed to decode event {}: {e}", E::SIGNATURE))
                }))
            } else {
                tracing::trace!("skipping log on receipt; does not match {}", E::SIGNATURE);
                None
            }
        })
        .collect()
}
