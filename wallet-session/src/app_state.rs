use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;

use crate::config_store::{ConfigStore, WalletConfig};
use crate::errors::{WalletError, WalletResult};
use crate::relayer::{RelayerClient, SponsorshipQuote};
use crate::rpc::{ChainRpc, RpcClient};
use crate::sdk::WalletSdk;
use crate::session::{SessionManager, SessionStatus};
use crate::storage::{EncryptedFileStorage, SecureStorage, WalletPaths};

/// Environment variable selecting the config environment name.
pub const ENV_WALLET_ENV: &str = "SMART_WALLET_ENV";

/// Everything the app needs for one wallet session, built once at start.
#[derive(Debug)]
pub struct WalletContext {
    paths: Option<WalletPaths>,
    config: WalletConfig,
    session: SessionManager,
    relayer: RelayerClient,
}

impl WalletContext {
    /// Build the context from `root_dir`: config from disk plus environment
    /// overrides, an encrypted session store unlocked with `passphrase`, and
    /// HTTP clients for the configured network.
    ///
    /// Blocking while the store key is derived; async callers should run it
    /// on `tokio::task::spawn_blocking`.
    pub fn initialize(
        root_dir: PathBuf,
        sdk: Arc<dyn WalletSdk>,
        passphrase: &SecretString,
    ) -> WalletResult<Self> {
        let environment =
            std::env::var(ENV_WALLET_ENV).unwrap_or_else(|_| "development".to_string());
        let paths = WalletPaths::new(&root_dir)?;
        paths.ensure_directories()?;

        let mut config = ConfigStore::from_paths(&paths).load_or_default(environment)?;
        config.apply_env_overrides()?;

        let storage = EncryptedFileStorage::open(
            paths.secure_store_file(),
            passphrase,
            config.storage.kdf,
        )?;
        let rpc = RpcClient::new(config.rpc_url())?;

        let mut context = Self::with_collaborators(config, sdk, Arc::new(storage), Arc::new(rpc))?;
        context.paths = Some(paths);
        log::info!(
            "Wallet context initialized for {} ({})",
            context.config.network,
            context.config.environment
        );
        Ok(context)
    }

    /// Build the context around caller-supplied storage and RPC.
    pub fn with_collaborators(
        config: WalletConfig,
        sdk: Arc<dyn WalletSdk>,
        storage: Arc<dyn SecureStorage>,
        rpc: Arc<dyn ChainRpc>,
    ) -> WalletResult<Self> {
        let relayer = RelayerClient::new(config.relayer_url())?;
        let session = SessionManager::new(
            config.network,
            sdk,
            storage,
            rpc,
            config.session_settings(),
        )?;

        Ok(Self {
            paths: None,
            config,
            session,
            relayer,
        })
    }

    /// Restore the persisted session. Must complete before the UI picks a
    /// connected or disconnected screen.
    pub async fn init(&self) -> SessionStatus {
        self.session.restore_session().await
    }

    /// Release in-memory state on shutdown; persisted data is kept.
    pub async fn teardown(&self) {
        self.session.teardown().await;
        log::info!("Wallet context torn down");
    }

    /// Explicit logout: disconnect and delete all persisted session data.
    pub async fn logout(&self) {
        self.session.disconnect_wallet().await;
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn relayer(&self) -> &RelayerClient {
        &self.relayer
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn paths(&self) -> Option<&WalletPaths> {
        self.paths.as_ref()
    }

    /// Ask the relayer whether it will pay the fee for `transaction` sent
    /// from the connected wallet.
    pub async fn quote_sponsorship(&self, transaction: &str) -> WalletResult<SponsorshipQuote> {
        let address = self.session.address().ok_or(WalletError::NotConnected)?;
        if !self.session.is_connected() {
            return Err(WalletError::NotConnected);
        }
        self.relayer.validate(transaction, &address).await
    }

    pub async fn relayer_available(&self) -> bool {
        self.relayer.health().await
    }
}
