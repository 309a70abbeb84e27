// lib.rs - Session and transaction state manager for passkey smart wallets

pub mod app_state;
pub mod config_store;
pub mod errors;
pub mod network;
pub mod relayer;
pub mod retry;
pub mod rpc;
pub mod sdk;
pub mod session;
pub mod storage;
pub mod transaction;
pub mod validation;

// Re-export common types
pub use app_state::WalletContext;
pub use config_store::{
    ConfigStore, EndpointOverrides, RetryConfig, SessionConfig, StorageConfig, WalletConfig,
};
pub use errors::{user_message, DelegateSource, ValidationError, WalletError, WalletResult};
pub use network::Network;
pub use relayer::{RelayerClient, SponsorshipQuote};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use rpc::{ChainRpc, RpcClient, SignatureStatus};
pub use sdk::{ConnectOptions, SdkState, SignOptions, SignedMessage, WalletDescriptor, WalletSdk};
pub use session::{SessionManager, SessionSettings, SessionStatus, WalletSession};
pub use storage::{EncryptedFileStorage, KdfCost, MemoryStorage, SecureStorage, WalletPaths};
pub use transaction::{
    ConfirmationMode, TransactionRecord, TransactionStatus, TransactionType, TransferOptions,
    TransferPayload,
};
pub use validation::InputValidator;
