//! HTTP client for the fee-sponsorship relayer
//!
//! The relayer validates a serialized transaction, reports whether it will
//! pay the network fee, and forwards sponsored transactions to the chain.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::errors::{DelegateSource, WalletError, WalletResult};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest<'a> {
    transaction: &'a str,
    user_address: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct SubmitRequest<'a> {
    transaction: &'a str,
}

/// Relayer verdict on a transaction it was asked to sponsor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipQuote {
    pub valid: bool,
    pub sponsorship_available: bool,
    #[serde(default)]
    pub fee: f64,
    #[serde(default)]
    pub fee_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SponsorshipQuote {
    pub fn is_sponsored(&self) -> bool {
        self.valid && self.sponsorship_available && self.error.is_none()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug)]
pub struct RelayerClient {
    client: Client,
    base_url: String,
}

impl RelayerClient {
    pub fn new(base_url: impl Into<String>) -> WalletResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WalletError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the relayer whether it will sponsor `transaction` for `user_address`.
    pub async fn validate(
        &self,
        transaction: &str,
        user_address: &str,
    ) -> WalletResult<SponsorshipQuote> {
        let url = format!("{}/validate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&ValidateRequest {
                transaction,
                user_address,
            })
            .send()
            .await?;

        check_status(response.status())?;
        response.json().await.map_err(|e| {
            WalletError::delegate(
                DelegateSource::Relayer,
                format!("Failed to parse validate response: {}", e),
            )
        })
    }

    /// Submit a sponsored transaction and return its chain signature.
    ///
    /// The session manager never calls this; the SDK submits its own
    /// transfers. It is here for embedders that build transactions
    /// themselves.
    pub async fn submit(&self, transaction: &str) -> WalletResult<String> {
        let url = format!("{}/submit", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SubmitRequest { transaction })
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(WalletError::Network(format!("HTTP error: {}", status)));
        }

        // Rejections carry an `{error}` body with a 4xx status.
        let body: SubmitResponse = response.json().await.map_err(|e| {
            WalletError::delegate(
                DelegateSource::Relayer,
                format!("Failed to parse submit response ({}): {}", status, e),
            )
        })?;
        submit_outcome(body)
    }

    /// True when `/health` answers with a success status.
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                log::warn!("Relayer health check failed: {}", err);
                false
            }
        }
    }
}

fn check_status(status: reqwest::StatusCode) -> WalletResult<()> {
    if status.is_server_error() || status.as_u16() == 429 {
        return Err(WalletError::Network(format!("HTTP error: {}", status)));
    }
    if !status.is_success() {
        return Err(WalletError::delegate(
            DelegateSource::Relayer,
            format!("HTTP error: {}", status),
        ));
    }
    Ok(())
}

fn submit_outcome(body: SubmitResponse) -> WalletResult<String> {
    if let Some(error) = body.error {
        return Err(WalletError::delegate(DelegateSource::Relayer, error));
    }

    match body.signature {
        Some(signature) if !signature.is_empty() => Ok(signature),
        _ => Err(WalletError::delegate(
            DelegateSource::Relayer,
            "Submit response carried no signature",
        )),
    }
}
