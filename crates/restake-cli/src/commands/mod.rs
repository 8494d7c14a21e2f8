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

//! Subcommands of the restake CLI.

mod address;
mod check_tx;
mod claim;
mod status;

pub use address::AddressCmd;
pub use check_tx::CheckTxCmd;
pub use claim::ClaimCmd;
pub use status::StatusCmd;

use std::process::ExitCode;

use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use crate::config::GlobalConfig;

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Claim or restake pending rewards if the cooldown has elapsed.
    Claim(ClaimCmd),
    /// Show balance, pending rewards and claim eligibility without submitting anything.
    Status(StatusCmd),
    /// Print a transaction by hash as JSON.
    CheckTx(CheckTxCmd),
    /// Print the address derived from the configured private key.
    Address(AddressCmd),
}

impl Command {
    /// Run the command. Long running commands stop at their next request once `cancel` fires.
    pub async fn run(
        &self,
        global_config: &GlobalConfig,
        cancel: &CancellationToken,
    ) -> anyhow::Result<ExitCode> {
        match self {
            Self::Claim(cmd) => cmd.run(global_config, cancel).await,
            Self::Status(cmd) => cmd.run(global_config, cancel).await,
            Self::CheckTx(cmd) => cmd.run(global_config).await,
            Self::Address(cmd) => cmd.run(global_config),
        }
    }
}
