use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{WalletError, WalletResult};

/// Filesystem locations owned by the session manager.
#[derive(Debug, Clone)]
pub struct WalletPaths {
    /// Root directory for wallet data.
    root_dir: PathBuf,
    /// Encrypted key-value store holding the persisted session.
    secure_store_file: PathBuf,
    /// Path to persisted wallet configuration.
    config_file: PathBuf,
}

impl WalletPaths {
    pub const DEFAULT_STORE_FILENAME: &'static str = "session.store";
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "wallet.config";

    /// Create a new path manager rooted at the provided directory.
    pub fn new(root: impl AsRef<Path>) -> WalletResult<Self> {
        let root_dir = root.as_ref().to_path_buf();
        if root_dir.as_os_str().is_empty() {
            return Err(WalletError::Storage(
                "Wallet root directory cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            secure_store_file: root_dir.join(Self::DEFAULT_STORE_FILENAME),
            config_file: root_dir.join(Self::DEFAULT_CONFIG_FILENAME),
            root_dir,
        })
    }

    /// Ensure the root directory exists.
    pub fn ensure_directories(&self) -> WalletResult<()> {
        fs::create_dir_all(&self.root_dir)?;
        Ok(())
    }

    pub fn secure_store_file(&self) -> &Path {
        &self.secure_store_file
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}
