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

use alloy::primitives::{address, Address};

/// EIP-155 chain ID of the Ronin mainnet.
pub const RONIN_CHAIN_ID: u64 = 2020;

/// Public Ronin mainnet RPC gateway. Requests must carry an `X-API-KEY` header.
pub const RONIN_MAINNET_RPC: &str = "https://api-gateway.skymavis.com/rpc";

/// Configuration for a deployment of the AXS staking pool.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    /// EIP-155 chain ID of the network.
    pub chain_id: Option<u64>,

    /// Address of the [IAxsStaking] pool contract.
    ///
    /// [IAxsStaking]: crate::contracts::IAxsStaking
    pub staking_pool_address: Address,
}

impl Deployment {
    /// Deployment with an explicitly configured pool address.
    pub fn custom(staking_pool_address: Address) -> Self {
        Self { chain_id: None, staking_pool_address }
    }

    /// Lookup the [Deployment] by chain ID.
    pub fn from_chain_id(chain_id: impl Into<u64>) -> Option<Deployment> {
        match chain_id.into() {
            RONIN_CHAIN_ID => Some(RONIN),
            _ => None,
        }
    }
}

/// [Deployment] for the Ronin mainnet.
pub const RONIN: Deployment = Deployment {
    chain_id: Some(RONIN_CHAIN_ID),
    staking_pool_address: address!("0x05b0bb3c1c320b280501b86706c3551995bc8571"),
};
