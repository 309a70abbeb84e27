use crate::errors::{ValidationError, WalletError, WalletResult};
use regex::Regex;

/// Largest public key the chain accepts, in bytes.
pub const ADDRESS_BYTES: usize = 32;
/// Longest address or token string inspected before pattern matching.
const MAX_INPUT_LEN: usize = 1000;

/// Input validation utilities for the session manager
#[derive(Debug, Clone)]
pub struct InputValidator {
    // Compiled regex patterns for performance
    address_pattern: Regex,
    token_pattern: Regex,
}

impl InputValidator {
    pub fn new() -> WalletResult<Self> {
        let address_pattern = Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$")
            .map_err(|e| WalletError::Config(format!("Invalid address regex: {}", e)))?;

        let token_pattern = Regex::new(r"^[A-Za-z0-9]{1,10}$")
            .map_err(|e| WalletError::Config(format!("Invalid token regex: {}", e)))?;

        Ok(InputValidator {
            address_pattern,
            token_pattern,
        })
    }

    /// Validate a base58 account address.
    ///
    /// The string must use the base58 alphabet and decode to at most
    /// [`ADDRESS_BYTES`] bytes, the same rule the chain's public key parser
    /// applies.
    pub fn validate_address(&self, address: &str) -> WalletResult<()> {
        self.check_length(address)?;

        if address.is_empty() {
            return Err(ValidationError::InvalidAddress("Address cannot be empty".to_string()).into());
        }

        if !self.address_pattern.is_match(address) {
            return Err(
                ValidationError::InvalidAddress("Address format is invalid".to_string()).into(),
            );
        }

        let decoded = bs58::decode(address).into_vec().map_err(|e| {
            WalletError::from(ValidationError::InvalidAddress(format!(
                "Address is not valid base58: {}",
                e
            )))
        })?;

        if decoded.len() > ADDRESS_BYTES {
            return Err(ValidationError::InvalidAddress(format!(
                "Address decodes to {} bytes, expected at most {}",
                decoded.len(),
                ADDRESS_BYTES
            ))
            .into());
        }

        Ok(())
    }

    pub fn is_valid_address(&self, address: &str) -> bool {
        self.validate_address(address).is_ok()
    }

    /// Validate a transfer amount
    pub fn validate_amount(&self, amount: f64) -> WalletResult<()> {
        if !amount.is_finite() {
            return Err(ValidationError::InvalidAmount("Amount must be a number".to_string()).into());
        }

        if amount <= 0.0 {
            return Err(
                ValidationError::InvalidAmount("Amount must be positive".to_string()).into(),
            );
        }

        Ok(())
    }

    /// Reject an amount above the cached balance. An unknown balance is not
    /// checked; the chain stays the source of truth.
    pub fn validate_against_balance(&self, amount: f64, balance: Option<u64>) -> WalletResult<()> {
        match balance {
            Some(available) if amount > available as f64 => {
                Err(ValidationError::InsufficientBalance {
                    requested: amount,
                    available,
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Validate a token symbol such as `USDC` or `SOL`
    pub fn validate_token(&self, token: &str) -> WalletResult<()> {
        self.check_length(token)?;

        if !self.token_pattern.is_match(token) {
            return Err(ValidationError::InvalidToken(format!(
                "Unsupported token symbol '{}'",
                token
            ))
            .into());
        }

        Ok(())
    }

    /// Validate a message before it is handed to the signer
    pub fn validate_message(&self, message: &str) -> WalletResult<()> {
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }

        Ok(())
    }

    /// Reject oversized input before running the regexes over it.
    fn check_length(&self, input: &str) -> WalletResult<()> {
        if input.len() > MAX_INPUT_LEN {
            return Err(ValidationError::InvalidInput("Input too long".to_string()).into());
        }

        Ok(())
    }
}
