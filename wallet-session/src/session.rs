use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::{user_message, DelegateSource, ValidationError, WalletError, WalletResult};
use crate::network::Network;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::rpc::{ChainRpc, SignatureStatus};
use crate::sdk::{ConnectOptions, SignOptions, SignedMessage, WalletSdk};
use crate::storage::SecureStorage;
use crate::transaction::{
    ConfirmationMode, TransactionRecord, TransactionStatus, TransferOptions, TransferPayload,
};
use crate::validation::InputValidator;

pub const KEY_WALLET_ADDRESS: &str = "walletAddress";
pub const KEY_LAST_ACTIVITY: &str = "lastActivity";
pub const KEY_TRANSACTIONS: &str = "transactions";

const PERSISTED_KEYS: [&str; 3] = [KEY_WALLET_ADDRESS, KEY_LAST_ACTIVITY, KEY_TRANSACTIONS];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SessionStatus {
    #[default]
    Uninitialized,
    Restoring,
    Connected,
    Disconnected,
}

/// Tunables for a session manager.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub confirmation_mode: ConfirmationMode,
    /// Applied to balance and status reads.
    pub retry_policy: RetryPolicy,
    pub status_poll_attempts: u32,
    pub status_poll_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            confirmation_mode: ConfirmationMode::Optimistic,
            retry_policy: RetryPolicy::default(),
            status_poll_attempts: 10,
            status_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSession {
    pub address: Option<String>,
    pub network: Network,
    pub last_activity: Option<i64>,
    pub balance: Option<u64>,
    pub status: SessionStatus,
    pub error: Option<String>,
    pub transactions: Vec<TransactionRecord>,
}

impl WalletSession {
    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected && self.address.is_some()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    address: Option<String>,
    last_activity: Option<i64>,
    balance: Option<u64>,
    status: SessionStatus,
    error: Option<String>,
    transactions: Vec<TransactionRecord>,
}

impl SessionState {
    fn disconnected() -> Self {
        Self {
            status: SessionStatus::Disconnected,
            ..Self::default()
        }
    }

    fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected && self.address.is_some()
    }
}

/// Outcome of reading the persisted session.
enum Restored {
    Empty,
    Session {
        address: String,
        last_activity: Option<i64>,
        transactions: Vec<TransactionRecord>,
    },
    Invalid(WalletError),
}

/// Owns wallet connection state and transaction history for one app
/// instance, mirroring both to secure storage.
///
/// Mutating operations are single-flight: each holds the operation lock for
/// its whole duration. Accessors only take the state lock and never wait on
/// an in-flight operation.
#[derive(Clone)]
pub struct SessionManager {
    network: Network,
    sdk: Arc<dyn WalletSdk>,
    storage: Arc<dyn SecureStorage>,
    rpc: Arc<dyn ChainRpc>,
    validator: InputValidator,
    settings: SessionSettings,
    state: Arc<RwLock<SessionState>>,
    op_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("network", &self.network)
            .field("settings", &self.settings)
            .field("state", &*self.state.read())
            .finish()
    }
}

impl SessionManager {
    pub fn new(
        network: Network,
        sdk: Arc<dyn WalletSdk>,
        storage: Arc<dyn SecureStorage>,
        rpc: Arc<dyn ChainRpc>,
        settings: SessionSettings,
    ) -> WalletResult<Self> {
        Ok(Self {
            network,
            sdk,
            storage,
            rpc,
            validator: InputValidator::new()?,
            settings,
            state: Arc::new(RwLock::new(SessionState::default())),
            op_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn status(&self) -> SessionStatus {
        self.state.read().status
    }

    pub fn is_connected(&self) -> bool {
        self.state.read().is_connected()
    }

    pub fn address(&self) -> Option<String> {
        self.state.read().address.clone()
    }

    pub fn balance(&self) -> Option<u64> {
        self.state.read().balance
    }

    pub fn last_activity(&self) -> Option<i64> {
        self.state.read().last_activity
    }

    /// History, newest first.
    pub fn transactions(&self) -> Vec<TransactionRecord> {
        self.state.read().transactions.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn clear_error(&self) {
        self.state.write().error = None;
    }

    pub fn snapshot(&self) -> WalletSession {
        let state = self.state.read();
        WalletSession {
            address: state.address.clone(),
            network: self.network,
            last_activity: state.last_activity,
            balance: state.balance,
            status: state.status,
            error: state.error.clone(),
            transactions: state.transactions.clone(),
        }
    }

    /// Restore the persisted session.
    ///
    /// Never fails: invalid or corrupted data clears the session and is
    /// reported through `last_error`. Callers should not render a
    /// connected/disconnected view until this returns.
    pub async fn restore_session(&self) -> SessionStatus {
        let _guard = self.op_lock.lock().await;
        self.state.write().status = SessionStatus::Restoring;

        match self.read_persisted().await {
            Ok(Restored::Empty) => {
                *self.state.write() = SessionState::disconnected();
                log::info!("No persisted wallet session");
            }
            Ok(Restored::Session {
                address,
                last_activity,
                transactions,
            }) => {
                log::info!(
                    "Restored wallet session for {} with {} transactions",
                    address,
                    transactions.len()
                );
                *self.state.write() = SessionState {
                    address: Some(address),
                    last_activity,
                    balance: None,
                    status: SessionStatus::Connected,
                    error: None,
                    transactions,
                };
            }
            Ok(Restored::Invalid(err)) => {
                log::warn!("Discarding persisted wallet session: {}", err);
                self.clear_locked().await;
                self.state.write().error = Some(user_message(&err));
            }
            Err(err) => {
                // Keys stay in place; the store may be readable next time.
                log::warn!("Failed to read persisted wallet session: {}", err);
                let mut state = SessionState::disconnected();
                state.error = Some(user_message(&err));
                *self.state.write() = state;
            }
        }

        self.status()
    }

    /// Run the SDK's passkey connect flow and persist the returned wallet.
    pub async fn connect_wallet(&self, options: ConnectOptions) -> WalletResult<String> {
        let _guard = self.op_lock.lock().await;

        let descriptor = match self.sdk.connect(&options).await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                log::warn!("Wallet connect failed: {}", err);
                return Err(self.record_error(err));
            }
        };

        if let Err(err) = self.validator.validate_address(&descriptor.address) {
            log::warn!("Wallet SDK returned an invalid address: {}", err);
            return Err(self.record_error(err));
        }

        let address = descriptor.address;
        let now = now_millis();
        let switched_wallet = {
            let mut state = self.state.write();
            let switched = state
                .address
                .as_deref()
                .is_some_and(|previous| previous != address);
            if switched {
                state.transactions.clear();
                state.balance = None;
            }
            state.address = Some(address.clone());
            state.last_activity = Some(now);
            state.status = SessionStatus::Connected;
            state.error = None;
            switched
        };

        self.persist(KEY_WALLET_ADDRESS, &address).await;
        self.persist(KEY_LAST_ACTIVITY, &now.to_string()).await;
        if switched_wallet {
            self.persist_transactions().await;
        }

        log::info!("Wallet connected: {}", address);
        Ok(address)
    }

    /// Disconnect from the SDK and clear all local session state. Local
    /// cleanup happens even when the SDK call fails.
    pub async fn disconnect_wallet(&self) {
        let _guard = self.op_lock.lock().await;

        if let Err(err) = self.sdk.disconnect().await {
            log::warn!("Wallet SDK disconnect failed: {}", err);
        }
        self.clear_locked().await;
        log::info!("Wallet disconnected");
    }

    /// Delete all persisted keys and reset in-memory state.
    pub async fn clear_session(&self) {
        let _guard = self.op_lock.lock().await;
        self.clear_locked().await;
    }

    /// Drop in-memory state without touching storage, for app shutdown.
    pub async fn teardown(&self) {
        let _guard = self.op_lock.lock().await;
        *self.state.write() = SessionState::default();
    }

    /// Sign an arbitrary message through the SDK.
    pub async fn sign_message(
        &self,
        message: &str,
        options: SignOptions,
    ) -> WalletResult<SignedMessage> {
        let _guard = self.op_lock.lock().await;
        self.require_connected()?;

        if let Err(err) = self.validator.validate_message(message) {
            return Err(self.record_error(err));
        }

        match self.sdk.sign_message(message, &options).await {
            Ok(signed) => {
                self.touch_activity().await;
                self.state.write().error = None;
                Ok(signed)
            }
            Err(err) => {
                log::warn!("Message signing failed: {}", err);
                Err(self.record_error(err))
            }
        }
    }

    /// Transfer `amount` of `token` to `recipient`.
    ///
    /// All inputs are validated before the SDK is called. The record is
    /// added to the front of the history only after the SDK returns; the
    /// cached balance is left as is until the next `fetch_balance`.
    pub async fn send_transaction(
        &self,
        recipient: &str,
        amount: f64,
        token: &str,
        options: TransferOptions,
    ) -> WalletResult<TransactionRecord> {
        let _guard = self.op_lock.lock().await;
        let from = self.require_connected()?;

        if let Err(err) = self.validate_transfer(&from, recipient, amount, token) {
            return Err(self.record_error(err));
        }

        let payload = TransferPayload {
            from,
            recipient: recipient.to_string(),
            amount,
            token: token.to_string(),
            fee_token: options.fee_token.clone(),
        };

        let submitted = match options.retry {
            Some(policy) => {
                let sdk = &self.sdk;
                let (payload, options) = (&payload, &options);
                retry_with_backoff(&policy, move || {
                    sdk.sign_and_execute_transaction(payload, options)
                })
                .await
            }
            None => self.sdk.sign_and_execute_transaction(&payload, &options).await,
        };

        let signature = match submitted {
            Ok(signature) => signature,
            Err(err) => {
                log::warn!("Transfer to {} failed: {}", recipient, err);
                return Err(self.record_error(err));
            }
        };

        let mut record = TransactionRecord::new(options.tx_type, amount, token)
            .with_recipient(recipient)
            .with_signature(signature);

        let mode = options
            .confirmation
            .unwrap_or(self.settings.confirmation_mode);
        let status = match mode {
            ConfirmationMode::Optimistic => TransactionStatus::Confirmed,
            ConfirmationMode::AwaitFinality if record.has_placeholder_signature() => {
                TransactionStatus::Pending
            }
            ConfirmationMode::AwaitFinality => self.poll_finality(&record.signature).await,
        };
        record.status = status;

        let now = now_millis();
        {
            let mut state = self.state.write();
            state.transactions.insert(0, record.clone());
            state.last_activity = Some(now);
            state.error = None;
        }
        self.persist_transactions().await;
        self.persist(KEY_LAST_ACTIVITY, &now.to_string()).await;

        log::info!(
            "Recorded {} {} transfer {} as {:?}",
            amount,
            token,
            record.id,
            record.status
        );
        Ok(record)
    }

    /// Refresh the cached balance. Failures leave the cached value in place.
    pub async fn fetch_balance(&self) -> Option<u64> {
        let _guard = self.op_lock.lock().await;
        let address = {
            let state = self.state.read();
            if !state.is_connected() {
                return state.balance;
            }
            state.address.clone()?
        };

        let rpc = &self.rpc;
        let address_ref = address.as_str();
        let fetched = retry_with_backoff(&self.settings.retry_policy, move || {
            rpc.get_balance(address_ref)
        })
        .await;

        let mut state = self.state.write();
        match fetched {
            Ok(balance) => state.balance = Some(balance),
            Err(err) => log::warn!("Balance refresh for {} failed: {}", address, err),
        }
        state.balance
    }

    /// Re-check a recorded transfer against the chain.
    pub async fn refresh_transaction_status(&self, id: &str) -> WalletResult<TransactionStatus> {
        let _guard = self.op_lock.lock().await;

        let record = self
            .state
            .read()
            .transactions
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or_else(|| WalletError::NotFound(format!("Transaction {}", id)))?;

        if record.has_placeholder_signature() {
            return Ok(record.status);
        }

        let rpc = &self.rpc;
        let signature = record.signature.as_str();
        let chain_status = retry_with_backoff(&self.settings.retry_policy, move || {
            rpc.get_signature_status(signature)
        })
        .await?;

        let status = match chain_status {
            SignatureStatus::Finalized | SignatureStatus::Confirmed => TransactionStatus::Confirmed,
            SignatureStatus::Failed => TransactionStatus::Failed,
            SignatureStatus::Processed | SignatureStatus::Unknown => record.status,
        };

        if status != record.status {
            {
                let mut state = self.state.write();
                if let Some(entry) = state.transactions.iter_mut().find(|r| r.id == id) {
                    entry.status = status;
                }
            }
            self.persist_transactions().await;
        }

        Ok(status)
    }

    /// Add a caller-classified record (receive, swap, billing) to the front
    /// of the history.
    pub async fn record_transaction(&self, record: TransactionRecord) -> WalletResult<()> {
        let _guard = self.op_lock.lock().await;
        self.require_connected()?;

        {
            let mut state = self.state.write();
            if state.transactions.iter().any(|r| r.id == record.id) {
                return Err(ValidationError::InvalidInput(format!(
                    "Duplicate transaction id {}",
                    record.id
                ))
                .into());
            }
            state.transactions.insert(0, record);
        }
        self.persist_transactions().await;
        Ok(())
    }

    fn require_connected(&self) -> WalletResult<String> {
        let state = self.state.read();
        match (&state.address, state.status) {
            (Some(address), SessionStatus::Connected) => Ok(address.clone()),
            _ => Err(WalletError::NotConnected),
        }
    }

    fn validate_transfer(
        &self,
        from: &str,
        recipient: &str,
        amount: f64,
        token: &str,
    ) -> WalletResult<()> {
        self.validator.validate_address(from)?;
        self.validator.validate_address(recipient)?;
        self.validator.validate_amount(amount)?;
        self.validator.validate_token(token)?;
        self.validator
            .validate_against_balance(amount, self.state.read().balance)
    }

    fn record_error(&self, err: WalletError) -> WalletError {
        self.state.write().error = Some(user_message(&err));
        err
    }

    async fn poll_finality(&self, signature: &str) -> TransactionStatus {
        for attempt in 0..self.settings.status_poll_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.settings.status_poll_interval).await;
            }
            match self.rpc.get_signature_status(signature).await {
                Ok(SignatureStatus::Finalized) | Ok(SignatureStatus::Confirmed) => {
                    return TransactionStatus::Confirmed
                }
                Ok(SignatureStatus::Failed) => return TransactionStatus::Failed,
                Ok(_) => {}
                Err(err) => log::warn!("Status poll for {} failed: {}", signature, err),
            }
        }
        TransactionStatus::Pending
    }

    async fn read_persisted(&self) -> WalletResult<Restored> {
        let Some(address) = self.storage.get(KEY_WALLET_ADDRESS).await? else {
            return Ok(Restored::Empty);
        };
        let last_activity = self.storage.get(KEY_LAST_ACTIVITY).await?;
        let transactions = self.storage.get(KEY_TRANSACTIONS).await?;

        if let Err(err) = self.validator.validate_address(&address) {
            return Ok(Restored::Invalid(err));
        }

        // The SDK may hold its own session; a different wallet there means
        // the stored history is not the user's current one.
        if let Some(sdk_address) = self.sdk.state().address {
            if sdk_address != address {
                return Ok(Restored::Invalid(WalletError::delegate(
                    DelegateSource::Sdk,
                    format!(
                        "SDK is connected to {} but the stored session belongs to {}",
                        sdk_address, address
                    ),
                )));
            }
        }

        let last_activity = match last_activity.map(|raw| raw.trim().parse::<i64>()) {
            None => None,
            Some(Ok(millis)) => Some(millis),
            Some(Err(e)) => {
                return Ok(Restored::Invalid(WalletError::Serialization(format!(
                    "Invalid lastActivity value: {}",
                    e
                ))))
            }
        };

        let transactions = match transactions {
            None => Vec::new(),
            Some(raw) => match serde_json::from_str::<Vec<TransactionRecord>>(&raw) {
                Ok(list) => list,
                Err(e) => return Ok(Restored::Invalid(e.into())),
            },
        };

        Ok(Restored::Session {
            address,
            last_activity,
            transactions,
        })
    }

    async fn clear_locked(&self) {
        for key in PERSISTED_KEYS {
            if let Err(err) = self.storage.delete(key).await {
                log::warn!("Failed to delete persisted key {}: {}", key, err);
            }
        }
        *self.state.write() = SessionState::disconnected();
    }

    async fn touch_activity(&self) {
        let now = now_millis();
        self.state.write().last_activity = Some(now);
        self.persist(KEY_LAST_ACTIVITY, &now.to_string()).await;
    }

    async fn persist_transactions(&self) {
        let encoded = serde_json::to_string(&self.state.read().transactions);
        match encoded {
            Ok(json) => self.persist(KEY_TRANSACTIONS, &json).await,
            Err(err) => log::warn!("Failed to encode transaction history: {}", err),
        }
    }

    async fn persist(&self, key: &str, value: &str) {
        if let Err(err) = self.storage.set(key, value).await {
            log::warn!("Failed to persist {}: {}", key, err);
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
