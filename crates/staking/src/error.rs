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

//! Typed errors produced at the chain client boundary.

use alloy::transports::{RpcError, TransportError};
use thiserror::Error;

/// Classification of a fault reported by the remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// The offered fee is below what the node currently accepts.
    Underpriced,
    /// The account cannot cover gas * price + value.
    InsufficientFunds,
    Other,
}

impl RpcErrorKind {
    /// Classify a node error from its message text.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("transaction underpriced") {
            Self::Underpriced
        } else if lower.contains("insufficient funds") {
            Self::InsufficientFunds
        } else {
            Self::Other
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String, kind: RpcErrorKind },

    #[error("block {0} not found")]
    MissingBlock(u64),

    #[error("block {block} has an invalid timestamp {timestamp}")]
    InvalidTimestamp { block: u64, timestamp: u64 },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ChainError {
    /// Build an [ChainError::Rpc], classifying it from the message.
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = RpcErrorKind::classify(&message);
        Self::Rpc { code, message, kind }
    }

    /// The classification of a remote fault, if this is one.
    pub fn rpc_kind(&self) -> Option<RpcErrorKind> {
        match self {
            Self::Rpc { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_underpriced(&self) -> bool {
        self.rpc_kind() == Some(RpcErrorKind::Underpriced)
    }

    pub fn is_insufficient_funds(&self) -> bool {
        self.rpc_kind() == Some(RpcErrorKind::InsufficientFunds)
    }
}

impl From<TransportError> for ChainError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => {
                // Some nodes put the rejection reason in `data` rather than `message`.
                let message = match payload.data.as_ref() {
                    Some(data) => format!("{} ({})", payload.message, data.get()),
                    None => payload.message.to_string(),
                };
                Self::rpc(payload.code, message)
            }
            RpcError::NullResp => Self::Decode("null response".to_string()),
            RpcError::DeserError { err, text } => Self::Decode(format!("{err}: {text}")),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<alloy::contract::Error> for ChainError {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(err) => err.into(),
            other => Self::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::rpc::json_rpc::ErrorPayload;

    use super::*;

    fn error_resp(message: &str) -> TransportError {
        RpcError::ErrorResp(ErrorPayload {
            code: -32000,
            message: message.to_string().into(),
            data: None,
        })
    }

    #[test]
    fn classifies_underpriced() {
        let err = ChainError::from(error_resp("transaction underpriced"));
        assert!(err.is_underpriced());
        assert!(!err.is_insufficient_funds());
        assert!(matches!(err, ChainError::Rpc { code: -32000, .. }));
    }

    #[test]
    fn classifies_insufficient_funds() {
        let err = ChainError::from(error_resp(
            "insufficient funds for gas * price + value: balance 0, tx cost 300000",
        ));
        assert_eq!(err.rpc_kind(), Some(RpcErrorKind::InsufficientFunds));
    }

    #[test]
    fn replacement_underpriced_is_underpriced() {
        assert_eq!(
            RpcErrorKind::classify("replacement transaction underpriced"),
            RpcErrorKind::Underpriced
        );
        assert_eq!(RpcErrorKind::classify("nonce too low"), RpcErrorKind::Other);
    }

    #[test]
    fn transport_faults_are_not_rpc_faults() {
        let err = ChainError::from(TransportError::NullResp);
        assert_eq!(err.rpc_kind(), None);
        assert!(!err.is_underpriced());
    }
}
