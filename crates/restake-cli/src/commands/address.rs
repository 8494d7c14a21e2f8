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

use anyhow::Context;
use clap::Args;

use crate::config::{parse_private_key, wallet_address, GlobalConfig};

/// Command to print the wallet address.
#[derive(Args, Clone, Debug)]
pub struct AddressCmd {}

impl AddressCmd {
    pub fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<ExitCode> {
        let key = global_config.private_key.as_deref().context(
            "Private key not provided; please set --private-key or the PRIVATE_KEY env var",
        )?;
        let Some(address) = wallet_address(key) else {
            let reason = parse_private_key(key).err().map(|e| e.to_string()).unwrap_or_default();
            tracing::error!("Invalid private key: {reason}");
            return Ok(ExitCode::FAILURE);
        };
        println!("{address}");
        Ok(ExitCode::SUCCESS)
    }
}
