//! Credential stores for the session layer.
//!
//! Two key/value stores back a session: a *volatile* store scoped to
//! the process, and a *durable* store that survives restarts and is
//! only used when the user opts in with "remember me". The durable
//! store is sealed at rest with ChaCha20-Poly1305; the sealing key
//! lives in the OS keychain.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use keyring::Entry;
use rand::RngCore;
use tracing::{debug, warn};

/// Keychain service name for the durable store sealing key
const KEYCHAIN_SERVICE: &str = "skillbridge";

/// Keychain entry name for the durable store sealing key
const KEYCHAIN_KEY_NAME: &str = "store-key";

/// Durable store file name inside the data directory
pub const STORE_FILE: &str = "session.bin";

/// ChaCha20-Poly1305 nonce length in bytes
const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 key length in bytes
const KEY_LEN: usize = 32;

/// Which of the two stores a value came from or is headed to.
///
/// Returned alongside every lookup so call sites branch on the store
/// explicitly instead of re-deriving where a value was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Volatile,
    Durable,
}

/// A synchronous string key/value store.
///
/// Reads are infallible by contract: a store that cannot read a key
/// reports it as absent. Writes surface I/O failures to the caller.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// MemoryStore
// ============================================================================

/// In-memory store. Holds the session for the lifetime of the process;
/// this is the volatile store, and doubles as both stores in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

// ============================================================================
// SealedFileStore
// ============================================================================

/// File-backed store, sealed at rest.
///
/// The whole key/value map is serialized to JSON and encrypted as one
/// blob: `[12-byte nonce][ciphertext]`. A fresh nonce is drawn for
/// every write. The map is held in memory so reads stay synchronous
/// and cheap; every mutation rewrites the file.
pub struct SealedFileStore {
    path: PathBuf,
    key: [u8; KEY_LEN],
    entries: Mutex<HashMap<String, String>>,
}

impl SealedFileStore {
    /// Open the store at `path`, loading or creating the sealing key in
    /// the OS keychain.
    pub fn open(path: PathBuf) -> Result<Self> {
        let entry = Entry::new(KEYCHAIN_SERVICE, KEYCHAIN_KEY_NAME)
            .context("Failed to create keyring entry for store key")?;

        let key = match entry.get_password() {
            Ok(encoded) => decode_key(&encoded)?,
            Err(keyring::Error::NoEntry) => {
                let mut key = [0u8; KEY_LEN];
                rand::rngs::OsRng.fill_bytes(&mut key);
                entry
                    .set_password(&encode_key(&key))
                    .context("Failed to store sealing key in keychain")?;
                debug!("created new store sealing key in keychain");
                key
            }
            Err(e) => {
                return Err(e).context("Failed to read store sealing key from keychain");
            }
        };

        Self::with_key(path, key)
    }

    /// Open the store with an explicit key, bypassing the keychain.
    pub fn with_key(path: PathBuf, key: [u8; KEY_LEN]) -> Result<Self> {
        let entries = Self::load(&path, &key)?;
        Ok(Self {
            path,
            key,
            entries: Mutex::new(entries),
        })
    }

    fn load(path: &std::path::Path, key: &[u8; KEY_LEN]) -> Result<HashMap<String, String>> {
        if !path.exists() {
            return Ok(HashMap::new());
        }

        let sealed = std::fs::read(path)
            .with_context(|| format!("Failed to read session store: {}", path.display()))?;

        if sealed.len() < NONCE_LEN {
            warn!(path = %path.display(), "session store file too short, starting empty");
            return Ok(HashMap::new());
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
        match cipher.decrypt(Nonce::from_slice(nonce), ciphertext) {
            Ok(plain) => match serde_json::from_slice(&plain) {
                Ok(entries) => Ok(entries),
                Err(e) => {
                    warn!(error = %e, "session store contents unparseable, starting empty");
                    Ok(HashMap::new())
                }
            },
            Err(_) => {
                // Wrong key or tampered file. Treat as no session rather
                // than failing the whole client.
                warn!(path = %path.display(), "could not unseal session store, starting empty");
                Ok(HashMap::new())
            }
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let plain = serde_json::to_vec(entries).context("Failed to serialize session store")?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key));
        let sealed = cipher
            .encrypt(Nonce::from_slice(&nonce), plain.as_slice())
            .map_err(|_| anyhow::anyhow!("Failed to seal session store"))?;

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, out)
            .with_context(|| format!("Failed to write session store: {}", self.path.display()))
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvStore for SealedFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }
}

fn encode_key(key: &[u8; KEY_LEN]) -> String {
    key.iter().map(|b| format!("{b:02x}")).collect()
}

fn decode_key(encoded: &str) -> Result<[u8; KEY_LEN]> {
    if encoded.len() != KEY_LEN * 2 {
        anyhow::bail!("Keychain entry has unexpected length {}", encoded.len());
    }
    let mut key = [0u8; KEY_LEN];
    for (i, chunk) in encoded.as_bytes().chunks(2).enumerate() {
        let hex = std::str::from_utf8(chunk).context("Keychain entry is not valid UTF-8")?;
        key[i] = u8::from_str_radix(hex, 16).context("Keychain entry is not valid hex")?;
    }
    Ok(key)
}

// ============================================================================
// StorePair
// ============================================================================

/// The volatile and durable stores a session spans.
///
/// Lookup order is volatile first, then durable: a fresh non-remembered
/// login must shadow anything an older remembered session left on disk.
pub struct StorePair {
    volatile: Box<dyn KvStore>,
    durable: Box<dyn KvStore>,
}

impl StorePair {
    pub fn new(volatile: Box<dyn KvStore>, durable: Box<dyn KvStore>) -> Self {
        Self { volatile, durable }
    }

    /// Production wiring: in-memory volatile store, sealed file durable
    /// store under the configured data directory.
    pub fn open_default(config: &crate::config::ClientConfig) -> Result<Self> {
        let path = config.data_dir()?.join(STORE_FILE);
        Ok(Self {
            volatile: Box::new(MemoryStore::new()),
            durable: Box::new(SealedFileStore::open(path)?),
        })
    }

    /// Both stores in memory. For tests and throwaway clients.
    pub fn in_memory() -> Self {
        Self {
            volatile: Box::new(MemoryStore::new()),
            durable: Box::new(MemoryStore::new()),
        }
    }

    pub fn store(&self, kind: StoreKind) -> &dyn KvStore {
        match kind {
            StoreKind::Volatile => self.volatile.as_ref(),
            StoreKind::Durable => self.durable.as_ref(),
        }
    }

    /// Find the first of `keys` present in either store, volatile first.
    /// Returns the value together with the store that held it.
    pub fn find(&self, keys: &[&str]) -> Option<(String, StoreKind)> {
        for kind in [StoreKind::Volatile, StoreKind::Durable] {
            for key in keys {
                if let Some(value) = self.store(kind).get(key) {
                    return Some((value, kind));
                }
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; KEY_LEN] {
        [7u8; KEY_LEN]
    }

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("access_token"), None);

        store.set("access_token", "abc").unwrap();
        assert_eq!(store.get("access_token").as_deref(), Some("abc"));

        store.remove("access_token").unwrap();
        assert_eq!(store.get("access_token"), None);
    }

    #[test]
    fn test_pair_checks_volatile_before_durable() {
        let pair = StorePair::in_memory();
        pair.store(StoreKind::Durable).set("access_token", "old").unwrap();
        pair.store(StoreKind::Volatile).set("access_token", "new").unwrap();

        let (value, kind) = pair.find(&["access_token"]).expect("should find token");
        assert_eq!(value, "new");
        assert_eq!(kind, StoreKind::Volatile);
    }

    #[test]
    fn test_pair_falls_back_to_durable() {
        let pair = StorePair::in_memory();
        pair.store(StoreKind::Durable).set("refresh_token", "r1").unwrap();

        let (value, kind) = pair.find(&["refresh_token"]).expect("should find token");
        assert_eq!(value, "r1");
        assert_eq!(kind, StoreKind::Durable);
    }

    #[test]
    fn test_pair_checks_key_aliases_in_order() {
        // A store written by an older client may only carry the legacy
        // camelCase alias.
        let pair = StorePair::in_memory();
        pair.store(StoreKind::Durable).set("refreshToken", "legacy").unwrap();

        let (value, kind) = pair
            .find(&["refresh_token", "refreshToken"])
            .expect("should find legacy alias");
        assert_eq!(value, "legacy");
        assert_eq!(kind, StoreKind::Durable);
    }

    #[test]
    fn test_pair_find_missing_returns_none() {
        let pair = StorePair::in_memory();
        assert!(pair.find(&["access_token", "accessToken"]).is_none());
    }

    #[test]
    fn test_sealed_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");

        let store = SealedFileStore::with_key(path.clone(), test_key()).unwrap();
        store.set("refresh_token", "r-secret").unwrap();
        store.set("role", "creator").unwrap();

        // Reopen from disk with the same key.
        drop(store);
        let reopened = SealedFileStore::with_key(path, test_key()).unwrap();
        assert_eq!(reopened.get("refresh_token").as_deref(), Some("r-secret"));
        assert_eq!(reopened.get("role").as_deref(), Some("creator"));
    }

    #[test]
    fn test_sealed_store_does_not_leak_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");

        let store = SealedFileStore::with_key(path.clone(), test_key()).unwrap();
        store.set("refresh_token", "super-secret-refresh").unwrap();

        let raw = std::fs::read(&path).unwrap();
        let raw_str = String::from_utf8_lossy(&raw);
        assert!(!raw_str.contains("super-secret-refresh"));
        assert!(!raw_str.contains("refresh_token"));
    }

    #[test]
    fn test_sealed_store_wrong_key_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");

        let store = SealedFileStore::with_key(path.clone(), test_key()).unwrap();
        store.set("access_token", "abc").unwrap();
        drop(store);

        let other = SealedFileStore::with_key(path, [9u8; KEY_LEN]).unwrap();
        assert_eq!(other.get("access_token"), None);
    }

    #[test]
    fn test_sealed_store_remove_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.bin");

        let store = SealedFileStore::with_key(path.clone(), test_key()).unwrap();
        store.set("access_token", "abc").unwrap();
        store.remove("access_token").unwrap();
        drop(store);

        let reopened = SealedFileStore::with_key(path, test_key()).unwrap();
        assert_eq!(reopened.get("access_token"), None);
    }

    #[test]
    fn test_key_encoding_round_trip() {
        let mut key = [0u8; KEY_LEN];
        for (i, b) in key.iter_mut().enumerate() {
            *b = i as u8;
        }
        let encoded = encode_key(&key);
        assert_eq!(encoded.len(), KEY_LEN * 2);
        assert_eq!(decode_key(&encoded).unwrap(), key);
    }

    #[test]
    fn test_decode_key_rejects_bad_input() {
        assert!(decode_key("too-short").is_err());
        assert!(decode_key(&"zz".repeat(KEY_LEN)).is_err());
    }
}
