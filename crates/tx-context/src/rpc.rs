//! JSON-RPC 2.0 wallet transport for nodes with unlocked accounts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ContextError;
use crate::wallet::{classify_rpc_error, Eip1193};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result(self, method: &str) -> Result<Value, ContextError> {
        match (self.error, self.result) {
            (Some(err), _) => {
                let error = classify_rpc_error(err.code, &err.message);
                debug!(method, code = err.code, error = %error, "rpc request failed");
                Err(error)
            }
            (None, Some(result)) => Ok(result),
            // `eth_getTransactionReceipt` answers a pending hash with null.
            (None, None) => Ok(Value::Null),
        }
    }
}

/// A wallet that forwards EIP-1193 requests to a JSON-RPC node.
///
/// The node signs with its own unlocked accounts, so `eth_requestAccounts`
/// is served as `eth_accounts`.
pub struct HttpWallet {
    http_client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpWallet {
    pub fn new(url: impl Into<String>) -> Result<Self, ContextError> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ContextError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ContextError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http_client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn node_method(method: &str) -> &str {
    match method {
        "eth_requestAccounts" => "eth_accounts",
        other => other,
    }
}

#[async_trait]
impl Eip1193 for HttpWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ContextError> {
        let method = node_method(method);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = body.id, url = %self.url, "rpc request");

        let response = self
            .http_client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ContextError::Network(format!("{method} timed out: {e}"))
                } else if e.is_connect() {
                    ContextError::Network(format!("connection to {} failed: {e}", self.url))
                } else {
                    ContextError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ContextError::Network(format!(
                "{method}: HTTP status {}",
                response.status()
            )));
        }

        let parsed: RpcResponse = response.json().await.map_err(|e| {
            ContextError::InvalidResponse(format!("{method}: malformed JSON-RPC response: {e}"))
        })?;
        parsed.into_result(method)
    }
}
