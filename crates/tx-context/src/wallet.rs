//! The injected wallet capability.
//!
//! Wallets expose a single EIP-1193 `request(method, params)` entry point.
//! The typed helpers on [`Eip1193`] cover the methods the transaction context
//! uses.

use std::sync::Arc;

use async_trait::async_trait;
use chain_eth::transaction::TransactionRequest;
use serde_json::{json, Value};

use crate::error::ContextError;

/// EIP-1193 error code for a request the user declined.
pub const USER_REJECTED_REQUEST: i64 = 4001;
/// EIP-1193 error code for a method or account the user has not authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// EIP-1193 error code for a provider disconnected from all chains.
pub const DISCONNECTED: i64 = 4900;
/// JSON-RPC error code nodes use for execution reverts.
pub const EXECUTION_REVERTED: i64 = 3;

/// A wallet reachable through EIP-1193 requests.
#[async_trait]
pub trait Eip1193: Send + Sync {
    /// Sends one request and returns its raw JSON result.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ContextError>;

    /// Accounts already authorized, without prompting (`eth_accounts`).
    async fn accounts(&self) -> Result<Vec<String>, ContextError> {
        let result = self.request("eth_accounts", json!([])).await?;
        parse_accounts("eth_accounts", result)
    }

    /// Prompts for account authorization (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<String>, ContextError> {
        let result = self.request("eth_requestAccounts", json!([])).await?;
        parse_accounts("eth_requestAccounts", result)
    }

    /// Submits a transaction for the wallet to sign; returns its hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, ContextError> {
        let params = serde_json::to_value([tx])
            .map_err(|e| ContextError::InvalidInput(format!("unserializable transaction: {e}")))?;
        match self.request("eth_sendTransaction", params).await? {
            Value::String(hash) => Ok(hash),
            other => Err(ContextError::InvalidResponse(format!(
                "eth_sendTransaction returned {other}, expected a hash"
            ))),
        }
    }
}

#[async_trait]
impl<T: Eip1193 + ?Sized> Eip1193 for Arc<T> {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ContextError> {
        (**self).request(method, params).await
    }
}

fn parse_accounts(method: &str, result: Value) -> Result<Vec<String>, ContextError> {
    serde_json::from_value(result).map_err(|e| {
        ContextError::InvalidResponse(format!("{method} did not return an account list: {e}"))
    })
}

/// Maps a wallet or JSON-RPC error object onto a context error kind.
pub fn classify_rpc_error(code: i64, message: &str) -> ContextError {
    let lower = message.to_lowercase();
    match code {
        USER_REJECTED_REQUEST => ContextError::UserRejected(message.to_string()),
        UNAUTHORIZED | DISCONNECTED => ContextError::WalletUnavailable(message.to_string()),
        EXECUTION_REVERTED => ContextError::ContractReverted(message.to_string()),
        _ if lower.contains("revert") => ContextError::ContractReverted(message.to_string()),
        _ if lower.contains("user denied") || lower.contains("user rejected") => {
            ContextError::UserRejected(message.to_string())
        }
        _ => ContextError::Network(format!("rpc error {code}: {message}")),
    }
}
