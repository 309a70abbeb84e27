use serde::{Deserialize, Serialize};
use std::fmt;

/// Input rejected before any collaborator is contacted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    InvalidAddress(String),
    InvalidAmount(String),
    InsufficientBalance { requested: f64, available: u64 },
    InvalidToken(String),
    EmptyMessage,
    InvalidInput(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ValidationError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            ValidationError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),
            ValidationError::InsufficientBalance {
                requested,
                available,
            } => write!(
                f,
                "Insufficient balance: requested {}, available {}",
                requested, available
            ),
            ValidationError::InvalidToken(msg) => write!(f, "Invalid token: {}", msg),
            ValidationError::EmptyMessage => write!(f, "Message cannot be empty"),
            ValidationError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

/// Which external collaborator produced a delegate failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelegateSource {
    Sdk,
    Rpc,
    Relayer,
}

impl fmt::Display for DelegateSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DelegateSource::Sdk => write!(f, "wallet SDK"),
            DelegateSource::Rpc => write!(f, "RPC"),
            DelegateSource::Relayer => write!(f, "relayer"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalletError {
    // Input errors
    Validation(ValidationError),
    NotConnected,

    // Collaborator errors
    Delegate {
        source: DelegateSource,
        message: String,
        user_cancelled: bool,
    },

    // Transport errors
    Network(String),
    Timeout,

    // Persistence errors
    Storage(String),
    Serialization(String),
    Crypto(String),

    // Application errors
    Config(String),
    NotFound(String),
}

impl WalletError {
    pub fn delegate(source: DelegateSource, message: impl Into<String>) -> Self {
        WalletError::Delegate {
            source,
            message: message.into(),
            user_cancelled: false,
        }
    }

    pub fn cancelled(source: DelegateSource, message: impl Into<String>) -> Self {
        WalletError::Delegate {
            source,
            message: message.into(),
            user_cancelled: true,
        }
    }

    /// Transport failures worth another attempt. Validation and delegate
    /// rejections are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WalletError::Network(_) | WalletError::Timeout)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::Validation(err) => write!(f, "Validation error: {}", err),
            WalletError::NotConnected => write!(f, "Wallet not connected"),

            WalletError::Delegate {
                source,
                message,
                user_cancelled,
            } => {
                if *user_cancelled {
                    write!(f, "{} request cancelled: {}", source, message)
                } else {
                    write!(f, "{} error: {}", source, message)
                }
            }

            WalletError::Network(msg) => write!(f, "Network error: {}", msg),
            WalletError::Timeout => write!(f, "Request timed out"),

            WalletError::Storage(msg) => write!(f, "Storage error: {}", msg),
            WalletError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            WalletError::Crypto(msg) => write!(f, "Cryptographic error: {}", msg),

            WalletError::Config(msg) => write!(f, "Configuration error: {}", msg),
            WalletError::NotFound(msg) => write!(f, "Not found: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {}

pub type WalletResult<T> = Result<T, WalletError>;

/// Message shown to the user in place of technical detail.
pub fn user_message(error: &WalletError) -> String {
    match error {
        WalletError::Validation(ValidationError::InvalidAddress(_)) => {
            "Please enter a valid wallet address.".to_string()
        }
        WalletError::Validation(ValidationError::InvalidAmount(_)) => {
            "Please enter an amount greater than zero.".to_string()
        }
        WalletError::Validation(ValidationError::InsufficientBalance {
            requested,
            available,
        }) => format!(
            "Insufficient balance: you tried to send {} but only {} is available.",
            requested, available
        ),
        WalletError::Validation(ValidationError::InvalidToken(_)) => {
            "This token is not supported.".to_string()
        }
        WalletError::Validation(ValidationError::EmptyMessage) => {
            "Please enter a message to sign.".to_string()
        }
        WalletError::Validation(ValidationError::InvalidInput(_)) => {
            "The input contains unsupported content.".to_string()
        }
        WalletError::NotConnected => "Please connect your wallet first.".to_string(),
        WalletError::Delegate {
            user_cancelled: true,
            ..
        } => "The request was cancelled.".to_string(),
        WalletError::Delegate {
            source: DelegateSource::Sdk,
            message,
            ..
        } => format!("Wallet request failed: {}", message),
        WalletError::Delegate {
            source: DelegateSource::Relayer,
            message,
            ..
        } => format!("Fee sponsorship is unavailable: {}", message),
        WalletError::Delegate {
            source: DelegateSource::Rpc,
            ..
        } => "Could not reach the network. Please try again.".to_string(),
        WalletError::Network(_) | WalletError::Timeout => {
            "Network error. Please check your connection and try again.".to_string()
        }
        WalletError::Storage(_) | WalletError::Serialization(_) => {
            "Could not access secure storage on this device.".to_string()
        }
        WalletError::Crypto(_) => "Secure storage could not be unlocked.".to_string(),
        WalletError::Config(_) => "The wallet is misconfigured.".to_string(),
        WalletError::NotFound(msg) => format!("Not found: {}", msg),
    }
}

impl From<ValidationError> for WalletError {
    fn from(error: ValidationError) -> Self {
        WalletError::Validation(error)
    }
}

// Conversion helpers
impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => WalletError::NotFound(error.to_string()),
            _ => WalletError::Storage(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::Serialization(format!("JSON error: {}", error))
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            WalletError::Timeout
        } else {
            WalletError::Network(format!("HTTP request failed: {}", error))
        }
    }
}
