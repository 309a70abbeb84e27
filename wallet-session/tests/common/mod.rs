#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use wallet_session::{
    ChainRpc, ConnectOptions, MemoryStorage, Network, RetryPolicy, SdkState, SecureStorage,
    SessionManager, SessionSettings, SignOptions, SignatureStatus, SignedMessage,
    TransferOptions, TransferPayload, WalletDescriptor, WalletError, WalletResult, WalletSdk,
};

pub const WALLET_A: &str = "11111111111111111111111111111111";
pub const WALLET_B: &str = "22222222222222222222222222222222";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

/// Scriptable stand-in for the passkey wallet SDK.
pub struct MockSdk {
    address: Mutex<String>,
    connect_error: Mutex<Option<WalletError>>,
    disconnect_fails: AtomicBool,
    reports_session: AtomicBool,
    sign_error: Mutex<Option<WalletError>>,
    send_errors: Mutex<VecDeque<WalletError>>,
    signature: Mutex<String>,
    send_delay: Mutex<Duration>,
    last_payload: Mutex<Option<TransferPayload>>,
    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub sign_calls: AtomicUsize,
    pub send_calls: AtomicUsize,
}

impl MockSdk {
    pub fn new(address: &str) -> Self {
        Self {
            address: Mutex::new(address.to_string()),
            connect_error: Mutex::new(None),
            disconnect_fails: AtomicBool::new(false),
            reports_session: AtomicBool::new(true),
            sign_error: Mutex::new(None),
            send_errors: Mutex::new(VecDeque::new()),
            signature: Mutex::new("5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnb".to_string()),
            send_delay: Mutex::new(Duration::ZERO),
            last_payload: Mutex::new(None),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            sign_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_address(&self, address: &str) {
        *self.address.lock().unwrap() = address.to_string();
    }

    pub fn fail_connect(&self, error: WalletError) {
        *self.connect_error.lock().unwrap() = Some(error);
    }

    pub fn fail_disconnect(&self) {
        self.disconnect_fails.store(true, Ordering::SeqCst);
    }

    /// Make `state()` report no connected wallet.
    pub fn forget_session(&self) {
        self.reports_session.store(false, Ordering::SeqCst);
    }

    pub fn fail_sign(&self, error: WalletError) {
        *self.sign_error.lock().unwrap() = Some(error);
    }

    /// Queue errors returned by the next transfers, in order.
    pub fn fail_next_sends(&self, errors: Vec<WalletError>) {
        self.send_errors.lock().unwrap().extend(errors);
    }

    pub fn set_signature(&self, signature: &str) {
        *self.signature.lock().unwrap() = signature.to_string();
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = delay;
    }

    pub fn last_payload(&self) -> Option<TransferPayload> {
        self.last_payload.lock().unwrap().clone()
    }

    pub fn sends(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletSdk for MockSdk {
    async fn connect(&self, _options: &ConnectOptions) -> WalletResult<WalletDescriptor> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.connect_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(WalletDescriptor {
            address: self.address.lock().unwrap().clone(),
            credential_id: Some("credential-1".to_string()),
        })
    }

    async fn disconnect(&self) -> WalletResult<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.disconnect_fails.load(Ordering::SeqCst) {
            return Err(WalletError::Network("portal unreachable".to_string()));
        }
        Ok(())
    }

    async fn sign_message(
        &self,
        message: &str,
        _options: &SignOptions,
    ) -> WalletResult<SignedMessage> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(SignedMessage(format!("signed:{}", message)))
    }

    async fn sign_and_execute_transaction(
        &self,
        payload: &TransferPayload,
        _options: &TransferOptions,
    ) -> WalletResult<String> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.send_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        *self.last_payload.lock().unwrap() = Some(payload.clone());
        Ok(self.signature.lock().unwrap().clone())
    }

    fn state(&self) -> SdkState {
        let address = self
            .reports_session
            .load(Ordering::SeqCst)
            .then(|| self.address.lock().unwrap().clone());
        SdkState {
            address,
            ..SdkState::default()
        }
    }
}

/// Scriptable stand-in for the chain RPC.
pub struct MockRpc {
    balance: Mutex<WalletResult<u64>>,
    statuses: Mutex<VecDeque<SignatureStatus>>,
    pub balance_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl MockRpc {
    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance: Mutex::new(Ok(balance)),
            statuses: Mutex::new(VecDeque::new()),
            balance_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_balance(&self, balance: WalletResult<u64>) {
        *self.balance.lock().unwrap() = balance;
    }

    /// Statuses returned by successive queries; the last one repeats.
    pub fn script_statuses(&self, statuses: Vec<SignatureStatus>) {
        *self.statuses.lock().unwrap() = statuses.into();
    }
}

#[async_trait]
impl ChainRpc for MockRpc {
    async fn get_balance(&self, _address: &str) -> WalletResult<u64> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.balance.lock().unwrap().clone()
    }

    async fn get_signature_status(&self, _signature: &str) -> WalletResult<SignatureStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().copied()
        };
        Ok(status.unwrap_or(SignatureStatus::Unknown))
    }
}

/// Memory-backed storage whose reads, writes and deletes can be made to fail.
#[derive(Default)]
pub struct FailingStorage {
    pub inner: MemoryStorage,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecureStorage for FailingStorage {
    async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(WalletError::Storage("keychain locked".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WalletError::Storage("disk full".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(WalletError::Storage("keychain locked".to_string()));
        }
        self.inner.delete(key).await
    }
}

pub fn fast_settings() -> SessionSettings {
    SessionSettings {
        retry_policy: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2)),
        status_poll_attempts: 5,
        status_poll_interval: Duration::from_millis(1),
        ..SessionSettings::default()
    }
}

pub fn manager_with(
    sdk: Arc<MockSdk>,
    storage: Arc<dyn SecureStorage>,
    rpc: Arc<MockRpc>,
) -> SessionManager {
    SessionManager::new(Network::Devnet, sdk, storage, rpc, fast_settings())
        .expect("session manager")
}

pub struct Harness {
    pub sdk: Arc<MockSdk>,
    pub rpc: Arc<MockRpc>,
    pub storage: Arc<MemoryStorage>,
    pub manager: SessionManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        let sdk = Arc::new(MockSdk::new(WALLET_A));
        let rpc = Arc::new(MockRpc::with_balance(100));
        let manager = manager_with(sdk.clone(), storage.clone(), rpc.clone());
        Self {
            sdk,
            rpc,
            storage,
            manager,
        }
    }

    /// Restore (empty) then connect as `WALLET_A`.
    pub async fn connected() -> Self {
        let harness = Self::new();
        harness.manager.restore_session().await;
        harness
            .manager
            .connect_wallet(ConnectOptions::default())
            .await
            .expect("connect");
        harness
    }
}
