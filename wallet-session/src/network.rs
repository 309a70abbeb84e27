//! Deployment targets and the endpoints derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Devnet,
    Mainnet,
    Localnet,
}

impl Network {
    /// JSON-RPC endpoint for balance and signature queries.
    pub fn rpc_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Mainnet => "https://api.mainnet-beta.solana.com",
            Network::Localnet => "http://127.0.0.1:8899",
        }
    }

    /// Fee-sponsorship relayer base URL.
    pub fn relayer_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://relayer.devnet.smartwallet.network",
            Network::Mainnet => "https://relayer.smartwallet.network",
            Network::Localnet => "http://127.0.0.1:8080",
        }
    }

    /// Passkey portal the SDK redirects to for the biometric ceremony.
    pub fn portal_url(&self) -> &'static str {
        match self {
            Network::Devnet | Network::Localnet => "https://portal.devnet.smartwallet.network",
            Network::Mainnet => "https://portal.smartwallet.network",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Devnet => "devnet",
            Network::Mainnet => "mainnet",
            Network::Localnet => "localnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = WalletError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Network::Devnet),
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "localnet" | "local" => Ok(Network::Localnet),
            other => Err(WalletError::Config(format!("Unknown network '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed_per_network() {
        assert_eq!(Network::Devnet.rpc_url(), Network::Devnet.rpc_url());
        assert_ne!(Network::Devnet.rpc_url(), Network::Mainnet.rpc_url());
        assert_ne!(Network::Devnet.relayer_url(), Network::Mainnet.relayer_url());
        assert!(Network::Localnet.rpc_url().starts_with("http://127.0.0.1"));
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("mainnet-beta".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!(" Devnet ".parse::<Network>().unwrap(), Network::Devnet);
        assert_eq!("local".parse::<Network>().unwrap(), Network::Localnet);
        assert!(matches!(
            "testnet".parse::<Network>(),
            Err(WalletError::Config(_))
        ));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&Network::Mainnet).unwrap();
        assert_eq!(json, "\"mainnet\"");
    }
}
