use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::retry::RetryPolicy;

/// Prefix of the signature stored when the signer returned none.
pub const PLACEHOLDER_SIGNATURE_PREFIX: &str = "pending-";

/// Local classification set by the caller, not parsed from the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Send,
    Receive,
    Swap,
    Billing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
}

/// How a transfer is marked once the signer returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationMode {
    /// Record as confirmed as soon as the signer returns.
    #[default]
    Optimistic,
    /// Record as pending and poll the chain for the final status.
    AwaitFinality,
}

/// One entry of the session's transaction history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    pub signature: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: f64,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub timestamp: i64,
    pub status: TransactionStatus,
}

impl TransactionRecord {
    pub fn new(tx_type: TransactionType, amount: f64, token: impl Into<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        Self {
            signature: placeholder_signature(&id),
            id,
            tx_type,
            amount,
            token: token.into(),
            recipient: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            status: TransactionStatus::Pending,
        }
    }

    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        if !signature.trim().is_empty() {
            self.signature = signature;
        }
        self
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    /// True when no chain signature is known yet.
    pub fn has_placeholder_signature(&self) -> bool {
        self.signature.starts_with(PLACEHOLDER_SIGNATURE_PREFIX)
    }
}

fn placeholder_signature(id: &str) -> String {
    format!("{}{}", PLACEHOLDER_SIGNATURE_PREFIX, id)
}

/// Transfer handed to the signer's sign-and-execute primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    pub from: String,
    pub recipient: String,
    pub amount: f64,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_token: Option<String>,
}

/// Per-call transfer settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferOptions {
    /// Deep link the passkey portal returns to.
    pub redirect_url: Option<String>,
    /// Token the relayer should charge the fee in; `None` lets it decide.
    pub fee_token: Option<String>,
    /// Retry policy for the signer call. Transfers are not idempotent, so
    /// nothing is retried unless this is set.
    pub retry: Option<RetryPolicy>,
    /// Overrides the session's confirmation mode.
    pub confirmation: Option<ConfirmationMode>,
    /// Classification stored on the record. Defaults to `send`.
    pub tx_type: TransactionType,
}
