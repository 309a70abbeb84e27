use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use blake3::Hasher as Blake3;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{WalletError, WalletResult};
use crate::network::Network;
use crate::retry::RetryPolicy;
use crate::session::SessionSettings;
use crate::storage::{KdfCost, WalletPaths};
use crate::transaction::ConfirmationMode;

const CONFIG_VERSION: u16 = 1;

const ENV_NETWORK: &str = "SMART_WALLET_NETWORK";
const ENV_RPC_URL: &str = "SMART_WALLET_RPC_URL";
const ENV_RELAYER_URL: &str = "SMART_WALLET_RELAYER_URL";
const ENV_RETRY_ATTEMPTS: &str = "SMART_WALLET_RETRY_ATTEMPTS";

/// Replacements for the endpoints derived from the network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EndpointOverrides {
    pub rpc_url: Option<String>,
    pub relayer_url: Option<String>,
    pub portal_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts.max(1),
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
        .with_jitter(Duration::from_millis(self.jitter_ms))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 2_000,
            jitter_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    pub confirmation_mode: ConfirmationMode,
    pub status_poll_attempts: u32,
    pub status_poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirmation_mode: ConfirmationMode::Optimistic,
            status_poll_attempts: 10,
            status_poll_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageConfig {
    pub kdf: KdfCost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    pub network: Network,
    pub endpoints: EndpointOverrides,
    pub retry: RetryConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub environment: String,
    pub last_updated: DateTime<Utc>,
    pub version: u16,
}

impl WalletConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            network: Network::default(),
            endpoints: EndpointOverrides::default(),
            retry: RetryConfig::default(),
            session: SessionConfig::default(),
            storage: StorageConfig::default(),
            environment: environment.into(),
            last_updated: Utc::now(),
            version: CONFIG_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn rpc_url(&self) -> &str {
        self.endpoints
            .rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.rpc_url())
    }

    pub fn relayer_url(&self) -> &str {
        self.endpoints
            .relayer_url
            .as_deref()
            .unwrap_or_else(|| self.network.relayer_url())
    }

    pub fn portal_url(&self) -> &str {
        self.endpoints
            .portal_url
            .as_deref()
            .unwrap_or_else(|| self.network.portal_url())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            confirmation_mode: self.session.confirmation_mode,
            retry_policy: self.retry.policy(),
            status_poll_attempts: self.session.status_poll_attempts,
            status_poll_interval: Duration::from_millis(self.session.status_poll_interval_ms),
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> WalletResult<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`. Empty values and values containing
    /// control characters are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> WalletResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Option<String> {
            let value = lookup(name)?;
            if value.trim().is_empty() {
                log::warn!("Environment variable {} is empty", name);
                return None;
            }
            if value.chars().any(|c| c.is_control()) {
                log::warn!(
                    "Environment variable {} contains control characters, ignoring",
                    name
                );
                return None;
            }
            log::debug!("Loaded configuration from environment variable {}", name);
            Some(value.trim().to_string())
        };

        if let Some(network) = read(ENV_NETWORK) {
            self.network = network.parse()?;
        }
        if let Some(url) = read(ENV_RPC_URL) {
            self.endpoints.rpc_url = Some(url);
        }
        if let Some(url) = read(ENV_RELAYER_URL) {
            self.endpoints.relayer_url = Some(url);
        }
        if let Some(attempts) = read(ENV_RETRY_ATTEMPTS) {
            self.retry.max_attempts = attempts.parse::<u32>().map_err(|_| {
                WalletError::Config(format!(
                    "Invalid numeric value '{}' for {}",
                    attempts, ENV_RETRY_ATTEMPTS
                ))
            })?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u16,
    checksum: [u8; 32],
    payload: WalletConfig,
    modified_at_unix: i64,
}

/// Handles persistence of wallet configuration with integrity checks.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_paths(paths: &WalletPaths) -> Self {
        Self {
            path: paths.config_file().to_path_buf(),
        }
    }

    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load_or_default(&self, environment: impl Into<String>) -> WalletResult<WalletConfig> {
        if !self.path.exists() {
            let config = WalletConfig::new(environment);
            self.save(&config)?;
            return Ok(config);
        }

        let bytes = fs::read(&self.path)?;
        let envelope: ConfigEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| WalletError::Config(format!("Unreadable config file: {}", e)))?;
        if envelope.version != CONFIG_VERSION {
            return Err(WalletError::Config(format!(
                "Unsupported config version {}",
                envelope.version
            )));
        }

        if checksum(&envelope.payload)? != envelope.checksum {
            return Err(WalletError::Config(
                "Config integrity verification failed".to_string(),
            ));
        }

        Ok(envelope.payload)
    }

    pub fn save(&self, config: &WalletConfig) -> WalletResult<()> {
        let mut payload = config.clone();
        payload.touch();

        let envelope = ConfigEnvelope {
            version: CONFIG_VERSION,
            checksum: checksum(&payload)?,
            modified_at_unix: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map_err(|e| WalletError::Storage(e.to_string()))?
                .as_secs() as i64,
            payload,
        };

        let serialized = serde_json::to_vec_pretty(&envelope)?;
        let tmp_path = self.path.with_extension("new");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&serialized)?;
            file.sync_all()?;
        }
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    pub fn update<F>(
        &self,
        environment: impl Into<String>,
        updater: F,
    ) -> WalletResult<WalletConfig>
    where
        F: FnOnce(&mut WalletConfig) -> WalletResult<()>,
    {
        let mut config = self.load_or_default(environment)?;
        updater(&mut config)?;
        config.touch();
        self.save(&config)?;
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn checksum(config: &WalletConfig) -> WalletResult<[u8; 32]> {
    let mut hasher = Blake3::new();
    let encoded = serde_json::to_vec(config)?;
    hasher.update(&encoded);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_bytes());
    Ok(output)
}
