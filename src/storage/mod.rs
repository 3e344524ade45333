//! Persisted session storage
//!
//! A string-keyed store holding the serialized token pair and the cached user
//! record, with three interchangeable backends.

use crate::api::{TokenPair, UserRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const TOKENS_KEY: &str = "tokens";
pub const USER_KEY: &str = "user";

const KEYRING_SERVICE: &str = "careerforge";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("Keychain error: {0}")]
    Keyring(String),
    #[error("Storage lock poisoned")]
    Poisoned,
}

pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn multi_set(&self, pairs: &[(&str, String)]) -> Result<(), StorageError>;
    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError>;

    fn set_item(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.multi_set(&[(key, value)])
    }
}

/// `file_name` inside the per-user `careerforge` config directory.
pub fn config_path(file_name: &str) -> PathBuf {
    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".config"));
    config_dir.join("careerforge").join(file_name)
}

/// In-process store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn multi_set(&self, pairs: &[(&str, String)]) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        for (key, value) in pairs {
            items.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut items = self.items.lock().map_err(|_| StorageError::Poisoned)?;
        for key in keys {
            items.remove(*key);
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    items: BTreeMap<String, String>,
}

/// JSON document on disk. Every write rewrites the whole file, so a
/// multi-key write lands together.
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            guard: Mutex::new(()),
        }
    }

    pub fn default_path() -> PathBuf {
        config_path("session.json")
    }

    fn load_data(&self) -> Result<StoreData, StorageError> {
        if !self.path.exists() {
            return Ok(StoreData::default());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let data = serde_json::from_str(&contents)?;
        Ok(data)
    }

    fn save_data(&self, data: &StoreData) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, contents)?;

        log::debug!("Session store saved to {:?}", self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.load_data()?.items.remove(key))
    }

    fn multi_set(&self, pairs: &[(&str, String)]) -> Result<(), StorageError> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let mut data = self.load_data()?;
        for (key, value) in pairs {
            data.items.insert(key.to_string(), value.clone());
        }
        self.save_data(&data)
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.guard.lock().map_err(|_| StorageError::Poisoned)?;
        let mut data = self.load_data()?;
        let original_len = data.items.len();
        data.items.retain(|key, _| !keys.contains(&key.as_str()));

        if data.items.len() < original_len {
            self.save_data(&data)?;
        }
        Ok(())
    }
}

/// OS keychain, one entry per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, StorageError> {
        keyring::Entry::new(&self.service, key).map_err(|e| StorageError::Keyring(e.to_string()))
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(StorageError::Keyring(e.to_string())),
        }
    }

    fn multi_set(&self, pairs: &[(&str, String)]) -> Result<(), StorageError> {
        for (key, value) in pairs {
            self.entry(key)?
                .set_password(value)
                .map_err(|e| StorageError::Keyring(e.to_string()))?;
        }
        Ok(())
    }

    fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        for key in keys {
            match self.entry(key)?.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(StorageError::Keyring(e.to_string())),
            }
        }
        Ok(())
    }
}

/// Typed view over a [`KeyValueStore`]. Cloning shares the same backend.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn load_tokens(&self) -> Result<Option<TokenPair>, StorageError> {
        self.load(TOKENS_KEY)
    }

    pub fn load_user(&self) -> Result<Option<UserRecord>, StorageError> {
        self.load(USER_KEY)
    }

    pub fn save_tokens(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        self.backend
            .set_item(TOKENS_KEY, serde_json::to_string(tokens)?)
    }

    pub fn save_user(&self, user: &UserRecord) -> Result<(), StorageError> {
        self.backend.set_item(USER_KEY, serde_json::to_string(user)?)
    }

    /// Writes the token pair and user record in one store call.
    pub fn save_session(&self, tokens: &TokenPair, user: &UserRecord) -> Result<(), StorageError> {
        let pairs = [
            (TOKENS_KEY, serde_json::to_string(tokens)?),
            (USER_KEY, serde_json::to_string(user)?),
        ];
        self.backend.multi_set(&pairs)
    }

    /// Removes both entries. Clearing an empty store is not an error.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.multi_remove(&[TOKENS_KEY, USER_KEY])
    }

    fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get_item(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        }
    }

    #[test]
    fn test_memory_store_session_roundtrip() {
        let store = TokenStore::in_memory();
        let user = UserRecord(json!({ "email": "user@example.com" }));
        store.save_session(&pair("a1", "r1"), &user).unwrap();

        assert_eq!(store.load_tokens().unwrap(), Some(pair("a1", "r1")));
        assert_eq!(store.load_user().unwrap(), Some(user));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = TokenStore::in_memory();
        store.save_tokens(&pair("a1", "r1")).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert!(store.load_tokens().unwrap().is_none());
        assert!(store.load_user().unwrap().is_none());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let first = TokenStore::new(Arc::new(FileStore::new(path.clone())));
        first
            .save_session(&pair("a1", "r1"), &UserRecord(json!({ "id": 1 })))
            .unwrap();

        let second = TokenStore::new(Arc::new(FileStore::new(path.clone())));
        assert_eq!(second.load_tokens().unwrap(), Some(pair("a1", "r1")));
        assert_eq!(second.load_user().unwrap(), Some(UserRecord(json!({ "id": 1 }))));

        second.clear().unwrap();
        assert!(first.load_tokens().unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.json"));
        assert!(store.get_item(TOKENS_KEY).unwrap().is_none());
        store.multi_remove(&[TOKENS_KEY]).unwrap();
        assert!(!dir.path().join("absent.json").exists());
    }

    #[test]
    fn test_corrupt_entry_surfaces_error() {
        let backend = Arc::new(MemoryStore::new());
        backend.set_item(TOKENS_KEY, "not json".to_string()).unwrap();
        let store = TokenStore::new(backend);
        assert!(matches!(store.load_tokens(), Err(StorageError::SerdeError(_))));
    }
}
