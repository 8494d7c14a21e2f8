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

use alloy::primitives::TxHash;
use anyhow::{Context, Result};
use clap::Args;

use crate::config::GlobalConfig;

/// Command to look up a transaction.
#[derive(Args, Clone, Debug)]
pub struct CheckTxCmd {
    /// Hash of the transaction.
    pub tx_hash: TxHash,
}

impl CheckTxCmd {
    pub async fn run(&self, global_config: &GlobalConfig) -> Result<ExitCode> {
        let client = global_config.build_client().await?;
        let Some(tx) = client
            .transaction(self.tx_hash)
            .await
            .with_context(|| format!("Failed to fetch transaction {}", self.tx_hash))?
        else {
            tracing::error!(tx_hash = %self.tx_hash, "Transaction not found");
            return Ok(ExitCode::FAILURE);
        };
        println!("{}", serde_json::to_string_pretty(&tx)?);
        Ok(ExitCode::SUCCESS)
    }
}
