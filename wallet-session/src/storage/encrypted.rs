use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use blake3::Hasher as Blake3;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::SecureStorage;
use crate::errors::{WalletError, WalletResult};

const STORE_MAGIC: &[u8; 8] = b"SWSTORE1";
const STORE_VERSION: u16 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Argon2id cost used to derive the store key from the passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024, // 64 MiB
            iterations: 3,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoreFile {
    magic: [u8; 8],
    version: u16,
    nonce: [u8; NONCE_LEN],
    kdf: KdfParameters,
    checksum: [u8; 32],
    ciphertext: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct KdfParameters {
    m_cost_kib: u32,
    t_cost: u32,
    p_cost: u32,
    salt: [u8; SALT_LEN],
}

impl KdfParameters {
    fn fresh(cost: KdfCost) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self {
            m_cost_kib: cost.memory_kib,
            t_cost: cost.iterations,
            p_cost: cost.parallelism,
            salt,
        }
    }
}

/// Single-file key-value store sealed with AES-256-GCM.
///
/// The key is derived once at open time. Every mutation rewrites the whole
/// file with a fresh nonce through a temp file and rename, on tokio's
/// blocking pool.
pub struct EncryptedFileStorage {
    inner: Arc<SealedStore>,
}

struct SealedStore {
    path: PathBuf,
    key: Zeroizing<[u8; KEY_LEN]>,
    kdf: KdfParameters,
    entries: Mutex<BTreeMap<String, String>>,
}

impl fmt::Debug for EncryptedFileStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedFileStorage")
            .field("path", &self.inner.path)
            .field("entries", &self.inner.entries.lock().len())
            .finish()
    }
}

impl EncryptedFileStorage {
    /// Open the store at `path`, creating an empty one if the file is
    /// missing. An existing file is decrypted with its own KDF parameters;
    /// `cost` only applies to new stores.
    ///
    /// Blocking: runs Argon2 and reads the file on the calling thread. From
    /// async code, call it inside `tokio::task::spawn_blocking`.
    pub fn open(
        path: impl AsRef<Path>,
        passphrase: &SecretString,
        cost: KdfCost,
    ) -> WalletResult<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            let kdf = KdfParameters::fresh(cost);
            let key = derive_key(passphrase, &kdf)?;
            return Ok(Self::from_parts(path, key, kdf, BTreeMap::new()));
        }

        let store_file = read_store_file(&path)?;
        let key = derive_key(passphrase, &store_file.kdf)?;
        let nonce = Nonce::assume_unique_for_key(store_file.nonce);
        let plaintext = decrypt_aes_gcm(&key, nonce, &store_file.ciphertext)?;
        if blake3_checksum(&plaintext) != store_file.checksum {
            return Err(WalletError::Crypto(
                "Secure store integrity verification failed".to_string(),
            ));
        }

        let entries: BTreeMap<String, String> = serde_json::from_slice(&plaintext)?;
        Ok(Self::from_parts(path, key, store_file.kdf, entries))
    }

    fn from_parts(
        path: PathBuf,
        key: Zeroizing<[u8; KEY_LEN]>,
        kdf: KdfParameters,
        entries: BTreeMap<String, String>,
    ) -> Self {
        Self {
            inner: Arc::new(SealedStore {
                path,
                key,
                kdf,
                entries: Mutex::new(entries),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    async fn mutate<F>(&self, change: F) -> WalletResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool + Send + 'static,
    {
        let store = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || store.mutate(change))
            .await
            .map_err(|e| WalletError::Storage(format!("Secure store write task failed: {}", e)))?
    }
}

impl SealedStore {
    fn persist(&self, entries: &BTreeMap<String, String>) -> WalletResult<()> {
        let plaintext = Zeroizing::new(serde_json::to_vec(entries)?);
        let checksum = blake3_checksum(&plaintext);

        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);
        let ciphertext = encrypt_aes_gcm(&self.key, nonce, &plaintext)?;

        let store_file = StoreFile {
            magic: *STORE_MAGIC,
            version: STORE_VERSION,
            nonce: nonce_bytes,
            kdf: self.kdf,
            checksum,
            ciphertext,
        };

        let serialized = serde_json::to_vec(&store_file)?;
        write_atomic(&self.path, &serialized)
    }

    /// Apply `change` to a copy of the entries and commit it only if the
    /// file write succeeds.
    fn mutate<F>(&self, change: F) -> WalletResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let mut entries = self.entries.lock();
        let mut updated = entries.clone();
        if !change(&mut updated) {
            return Ok(());
        }
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }
}

#[async_trait]
impl SecureStorage for EncryptedFileStorage {
    async fn get(&self, key: &str) -> WalletResult<Option<String>> {
        Ok(self.inner.entries.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> WalletResult<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.mutate(move |entries| {
            entries.insert(key, value);
            true
        })
        .await
    }

    async fn delete(&self, key: &str) -> WalletResult<()> {
        let key = key.to_string();
        self.mutate(move |entries| entries.remove(&key).is_some())
            .await
    }
}

fn read_store_file(path: &Path) -> WalletResult<StoreFile> {
    let bytes = fs::read(path)?;
    let store_file: StoreFile = serde_json::from_slice(&bytes)?;

    if &store_file.magic != STORE_MAGIC {
        return Err(WalletError::Storage(
            "Invalid secure store magic marker".to_string(),
        ));
    }

    if store_file.version != STORE_VERSION {
        return Err(WalletError::Storage(format!(
            "Unsupported secure store version: {}",
            store_file.version
        )));
    }

    Ok(store_file)
}

fn derive_key(
    passphrase: &SecretString,
    params: &KdfParameters,
) -> WalletResult<Zeroizing<[u8; KEY_LEN]>> {
    let argon_params = Params::new(
        params.m_cost_kib,
        params.t_cost,
        params.p_cost,
        Some(KEY_LEN),
    )
    .map_err(|e| WalletError::Crypto(format!("Invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(
            passphrase.expose_secret().as_bytes(),
            &params.salt,
            key.as_mut(),
        )
        .map_err(|e| WalletError::Crypto(format!("KDF failed: {e}")))?;
    Ok(key)
}

fn encrypt_aes_gcm(
    key: &Zeroizing<[u8; KEY_LEN]>,
    nonce: Nonce,
    plaintext: &[u8],
) -> WalletResult<Vec<u8>> {
    let unbound_key = UnboundKey::new(&aead::AES_256_GCM, key.as_ref())
        .map_err(|e| WalletError::Crypto(format!("Invalid encryption key: {e}")))?;
    let key = LessSafeKey::new(unbound_key);

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| WalletError::Crypto("Encryption failure".to_string()))?;
    Ok(in_out)
}

fn decrypt_aes_gcm(
    key: &Zeroizing<[u8; KEY_LEN]>,
    nonce: Nonce,
    ciphertext: &[u8],
) -> WalletResult<Zeroizing<Vec<u8>>> {
    let unbound_key = UnboundKey::new(&aead::AES_256_GCM, key.as_ref())
        .map_err(|e| WalletError::Crypto(format!("Invalid encryption key: {e}")))?;
    let key = LessSafeKey::new(unbound_key);

    if ciphertext.len() < aead::AES_256_GCM.tag_len() {
        return Err(WalletError::Crypto(
            "Ciphertext shorter than authentication tag".to_string(),
        ));
    }

    let mut in_out = Zeroizing::new(ciphertext.to_vec());
    let plaintext_len = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| WalletError::Crypto("Decryption failure".to_string()))?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}

fn blake3_checksum(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake3::new();
    hasher.update(data);
    let mut output = [0u8; 32];
    output.copy_from_slice(hasher.finalize().as_bytes());
    output
}

fn write_atomic(path: &Path, bytes: &[u8]) -> WalletResult<()> {
    let dir = path
        .parent()
        .ok_or_else(|| WalletError::Storage("Invalid secure store path".to_string()))?;
    fs::create_dir_all(dir)?;

    let tmp_path = path.with_extension("new");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(tmp_path, path)?;
    Ok(())
}
