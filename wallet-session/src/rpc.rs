//! Chain RPC access for balance and signature status queries
//!
//! `ChainRpc` is the seam the session manager depends on; `RpcClient` is the
//! HTTP JSON-RPC implementation used in production.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{DelegateSource, WalletError, WalletResult};

/// Chain-side progress of a submitted signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureStatus {
    Processed,
    Confirmed,
    Finalized,
    Failed,
    /// The node has no record of the signature (yet).
    Unknown,
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Native-unit balance of `address`.
    async fn get_balance(&self, address: &str) -> WalletResult<u64>;
    async fn get_signature_status(&self, signature: &str) -> WalletResult<SignatureStatus>;
}

/// HTTP client for chain JSON-RPC communication
#[derive(Debug)]
pub struct RpcClient {
    client: Client,
    base_url: String,
    next_id: AtomicU64,
}

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Value wrapped with the slot context it was read at.
#[derive(Debug, Deserialize)]
struct RpcContextValue<T> {
    value: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

impl RpcClient {
    /// Create a new RPC client
    pub fn new(base_url: impl Into<String>) -> WalletResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WalletError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(RpcClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn rpc_call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> WalletResult<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(WalletError::Network(format!("HTTP error: {}", status)));
        }
        if !status.is_success() {
            return Err(WalletError::delegate(
                DelegateSource::Rpc,
                format!("HTTP error: {}", status),
            ));
        }

        let rpc_response: JsonRpcResponse<T> = response.json().await.map_err(|e| {
            WalletError::delegate(
                DelegateSource::Rpc,
                format!("Failed to parse response: {}", e),
            )
        })?;

        if let Some(error) = rpc_response.error {
            return Err(WalletError::delegate(
                DelegateSource::Rpc,
                format!("RPC error {}: {}", error.code, error.message),
            ));
        }

        rpc_response.result.ok_or_else(|| {
            WalletError::delegate(DelegateSource::Rpc, "No result in RPC response")
        })
    }
}

#[async_trait]
impl ChainRpc for RpcClient {
    async fn get_balance(&self, address: &str) -> WalletResult<u64> {
        let params = serde_json::json!([address, { "commitment": "confirmed" }]);
        let response: RpcContextValue<u64> = self.rpc_call("getBalance", params).await?;
        Ok(response.value)
    }

    async fn get_signature_status(&self, signature: &str) -> WalletResult<SignatureStatus> {
        let params = serde_json::json!([[signature], { "searchTransactionHistory": true }]);
        let response: RpcContextValue<Vec<Option<RpcSignatureStatus>>> =
            self.rpc_call("getSignatureStatuses", params).await?;
        Ok(signature_status_from(
            response.value.into_iter().next().flatten(),
        ))
    }
}

fn signature_status_from(status: Option<RpcSignatureStatus>) -> SignatureStatus {
    let Some(status) = status else {
        return SignatureStatus::Unknown;
    };

    if status.err.as_ref().is_some_and(|err| !err.is_null()) {
        return SignatureStatus::Failed;
    }

    match status.confirmation_status.as_deref() {
        Some("finalized") => SignatureStatus::Finalized,
        Some("confirmed") => SignatureStatus::Confirmed,
        Some("processed") => SignatureStatus::Processed,
        _ => SignatureStatus::Unknown,
    }
}
