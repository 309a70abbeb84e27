pub mod encrypted;
pub mod memory;
pub mod paths;

use async_trait::async_trait;

use crate::errors::WalletResult;

pub use encrypted::{EncryptedFileStorage, KdfCost};
pub use memory::MemoryStorage;
pub use paths::WalletPaths;

/// Encrypted key-value persistence. At-rest protection is the
/// implementation's responsibility.
#[async_trait]
pub trait SecureStorage: Send + Sync {
    async fn get(&self, key: &str) -> WalletResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> WalletResult<()>;
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> WalletResult<()>;
}
