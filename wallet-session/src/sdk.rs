//! Contract of the external passkey wallet SDK.
//!
//! The biometric ceremony, signing and broadcasting all happen inside the
//! SDK; the session manager only sees the results.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::WalletResult;
use crate::transaction::{TransferOptions, TransferPayload};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectOptions {
    /// Deep link the passkey portal returns to after the ceremony.
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOptions {
    pub redirect_url: Option<String>,
}

/// Wallet returned by a successful connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDescriptor {
    pub address: String,
    #[serde(default)]
    pub credential_id: Option<String>,
}

/// Opaque result of a message signature.
///
/// Some SDK builds return a success marker instead of a real signature, so
/// this must not be treated as verifiable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage(pub String);

impl SignedMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Read-only view of the SDK's own connection flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkState {
    pub address: Option<String>,
    pub is_connecting: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

#[async_trait]
pub trait WalletSdk: Send + Sync {
    async fn connect(&self, options: &ConnectOptions) -> WalletResult<WalletDescriptor>;

    /// Best-effort; callers must not gate local cleanup on it.
    async fn disconnect(&self) -> WalletResult<()>;

    async fn sign_message(&self, message: &str, options: &SignOptions)
        -> WalletResult<SignedMessage>;

    /// Signs and submits a transfer, returning the chain signature. An empty
    /// string means the SDK did not report one synchronously.
    async fn sign_and_execute_transaction(
        &self,
        payload: &TransferPayload,
        options: &TransferOptions,
    ) -> WalletResult<String>;

    fn state(&self) -> SdkState;
}
