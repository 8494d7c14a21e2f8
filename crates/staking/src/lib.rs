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

//! Contract bindings and chain access for the AXS staking pool on Ronin.

pub mod alloy_client;
pub mod client;
pub mod contracts;
pub mod deployments;
pub mod error;

pub use alloy_client::AlloyChainClient;
pub use client::{
    BlockWindow, ChainClient, ClaimMode, ClaimReceipt, EventKind, FeeHistoryData, FeeOverrides,
    FeePricing, LogEvent,
};
pub use deployments::Deployment;
pub use error::{ChainError, RpcErrorKind};
