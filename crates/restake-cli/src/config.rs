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

//! Common configuration options for commands in the restake CLI.

use std::{num::ParseIntError, time::Duration};

use alloy::{hex, primitives::Address, signers::local::PrivateKeySigner};
use anyhow::{bail, ensure, Context, Result};
use axs_staking::{
    deployments::RONIN_MAINNET_RPC, AlloyChainClient, ChainError, ClaimMode, Deployment,
};
use clap::Args;
use url::Url;

/// Receipt wait used when `--tx-timeout` is not set.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(120);

/// Common configuration options for all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalConfig {
    /// URL of the Ronin RPC gateway
    #[clap(short, long, env = "RPC_URL", global = true, default_value = RONIN_MAINNET_RPC)]
    pub rpc_url: Url,

    /// Private key of the staking wallet, hex encoded with an optional 0x prefix
    #[clap(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<String>,

    /// API key sent in the X-API-KEY header of every RPC request
    #[clap(long, env = "X_API_KEY", global = true, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Address of the AXS staking pool. Defaults to the known deployment for the chain.
    #[clap(long, env = "AXS_CONTRACT_ADDR", global = true)]
    pub contract_address: Option<Address>,

    /// Transaction receipt timeout in seconds.
    #[clap(long, env = "TX_TIMEOUT", global = true, value_parser = |arg: &str| -> Result<Duration, ParseIntError> {Ok(Duration::from_secs(arg.parse()?))})]
    pub tx_timeout: Option<Duration>,

    /// Whether to log in JSON format.
    #[clap(long, env = "LOG_JSON", global = true, default_value_t = false)]
    pub log_json: bool,
}

/// Decode a hex private key, requiring exactly 32 bytes.
pub fn parse_private_key(value: &str) -> Result<PrivateKeySigner> {
    let value = value.trim();
    let bytes = hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .context("Private key is not valid hex")?;
    ensure!(bytes.len() == 32, "Private key must be 32 bytes, got {}", bytes.len());
    PrivateKeySigner::from_slice(&bytes).context("Private key is not a valid secp256k1 scalar")
}

/// Address of the wallet for `private_key`, or `None` if the key is malformed.
pub fn wallet_address(private_key: &str) -> Option<Address> {
    parse_private_key(private_key).ok().map(|signer| signer.address())
}

/// Turn the bytecode lookup for `staking_pool` into a user-facing pre-flight error.
///
/// The gateway rejects requests with a bad key, so a failed lookup gets the same hint as missing
/// bytecode, with the underlying error attached.
fn check_deployed(staking_pool: Address, deployed: Result<bool, ChainError>) -> Result<()> {
    const HINT: &str = "API key might be invalid or contract not deployed";
    match deployed {
        Ok(true) => Ok(()),
        Ok(false) => bail!("No contract found at {staking_pool}. {HINT}"),
        Err(err) => Err(anyhow::Error::new(err)
            .context(format!("Failed to look up contract at {staking_pool}. {HINT}"))),
    }
}

impl GlobalConfig {
    /// Access [Self::private_key] or return an error that can be shown to the user.
    pub fn require_private_key(&self) -> Result<PrivateKeySigner> {
        let key = self.private_key.as_deref().context(
            "Private key not provided; please set --private-key or the PRIVATE_KEY env var",
        )?;
        parse_private_key(key)
    }

    /// Access [Self::api_key] or return an error that can be shown to the user.
    pub fn require_api_key(&self) -> Result<String> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            Some(_) => bail!("API key is empty; please set --api-key or the X_API_KEY env var"),
            None => bail!("API key not provided; please set --api-key or the X_API_KEY env var"),
        }
    }

    pub fn tx_timeout(&self) -> Duration {
        self.tx_timeout.unwrap_or(DEFAULT_TX_TIMEOUT)
    }

    /// Build a read-only [AlloyChainClient].
    ///
    /// Requires [Self::api_key] to be set.
    pub async fn build_client(&self) -> Result<AlloyChainClient> {
        let api_key = self.require_api_key()?;
        self.connect(&api_key, None, ClaimMode::default()).await
    }

    /// Build an [AlloyChainClient] that signs claims with [Self::private_key].
    ///
    /// Requires [Self::private_key] and [Self::api_key] to be set. Both are validated before any
    /// request is made.
    pub async fn build_client_with_signer(
        &self,
        mode: ClaimMode,
    ) -> Result<(AlloyChainClient, Address)> {
        let signer = self.require_private_key()?;
        let api_key = self.require_api_key()?;
        let account = signer.address();
        Ok((self.connect(&api_key, Some(signer), mode).await?, account))
    }

    async fn connect(
        &self,
        api_key: &str,
        signer: Option<PrivateKeySigner>,
        mode: ClaimMode,
    ) -> Result<AlloyChainClient> {
        let rpc_url = self.rpc_url.clone();
        let staking_pool = match self.contract_address {
            Some(address) => Deployment::custom(address),
            None => {
                let lookup = AlloyChainClient::connect(
                    rpc_url.clone(),
                    api_key,
                    None,
                    Address::ZERO,
                    mode,
                    None,
                )?;
                let chain_id = lookup
                    .chain_id()
                    .await
                    .with_context(|| format!("failed to connect to {rpc_url}"))?;
                Deployment::from_chain_id(chain_id).with_context(|| {
                    format!(
                        "no known staking pool for chain ID {chain_id}; please set \
                         --contract-address or the AXS_CONTRACT_ADDR env var"
                    )
                })?
            }
        }
        .staking_pool_address;

        let client = AlloyChainClient::connect(rpc_url, api_key, signer, staking_pool, mode, None)?;

        check_deployed(staking_pool, client.contract_deployed().await)?;
        Ok(client)
    }
}
