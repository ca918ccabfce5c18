use sled::Db;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Tree holding every namespaced key (mirrors one origin's local storage)
const LOCAL_STORAGE_TREE: &str = "local_storage";

/// Synchronous string key-value store.
///
/// Values are UTF-8 JSON documents. There are no transactions and no
/// cross-key atomicity: a caller reads a whole value, changes it in memory
/// and writes the whole value back.
pub trait KvStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;

    /// False when running somewhere no store exists; bootstrap is skipped then.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: KvStore + ?Sized> KvStore for &T {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        (**self).remove(key)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// On-disk store backed by Sled.
#[derive(Clone)] // Sled handles are cheap to clone and share the same database
pub struct SledStore {
    db: Db,
    tree: sled::Tree,
}

impl SledStore {
    /// Open or create the Sled database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Throwaway database removed when dropped (tests, dry runs)
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let tree = db.open_tree(LOCAL_STORAGE_TREE)?;
        Ok(Self { db, tree })
    }

    /// Every key currently stored, in byte order.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for item in self.tree.iter().keys() {
            let key = item?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.tree.get(key.as_bytes())? {
            Some(bytes) => {
                let value = String::from_utf8(bytes.to_vec()).map_err(|_| StoreError::Encoding {
                    key: key.to_owned(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.tree.insert(key.as_bytes(), value.as_bytes())?;
        // Flush so a short-lived CLI process leaves the write on disk
        self.db.flush()?;
        debug!(key, bytes = value.len(), "sled set");
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.tree.remove(key.as_bytes())?;
        self.db.flush()?;
        debug!(key, "sled remove");
        Ok(())
    }
}

/// In-process store; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Stand-in for contexts with no persistent store at all.
///
/// Reads see nothing; any write fails with [`StoreError::Unavailable`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedStore;

impl KvStore for DetachedStore {
    fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable)
    }

    fn remove(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable)
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KvStore) {
        assert_eq!(store.get("adotadog_dogs").unwrap(), None);

        store.set("adotadog_dogs", "[]").unwrap();
        assert_eq!(store.get("adotadog_dogs").unwrap().as_deref(), Some("[]"));

        store.set("adotadog_dogs", r#"[{"id":"1"}]"#).unwrap();
        assert_eq!(
            store.get("adotadog_dogs").unwrap().as_deref(),
            Some(r#"[{"id":"1"}]"#)
        );

        store.remove("adotadog_dogs").unwrap();
        assert_eq!(store.get("adotadog_dogs").unwrap(), None);

        // Removing an absent key is not an error
        store.remove("adotadog_dogs").unwrap();
    }

    #[test]
    fn test_memory_store_get_set_remove() {
        let store = MemoryStore::new();
        exercise(&store);
        assert!(store.is_empty());
    }

    #[test]
    fn test_sled_store_get_set_remove() {
        let store = SledStore::temporary().expect("Failed to open temporary sled");
        exercise(&store);
    }

    #[test]
    fn test_sled_store_survives_reopen() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("store");

        {
            let store = SledStore::open(&path).expect("Failed to open storage");
            store.set("adotadog_users", r#"[{"id":"1"}]"#).unwrap();
            store.set("adotadog_current_user", r#"{"id":"1"}"#).unwrap();
        }

        let reopened = SledStore::open(&path).expect("Failed to reopen storage");
        assert_eq!(
            reopened.get("adotadog_users").unwrap().as_deref(),
            Some(r#"[{"id":"1"}]"#)
        );
        assert_eq!(
            reopened.keys().unwrap(),
            vec!["adotadog_current_user".to_string(), "adotadog_users".to_string()]
        );
    }

    #[test]
    fn test_detached_store_refuses_writes() {
        let store = DetachedStore;
        assert!(!store.is_available());
        assert_eq!(store.get("adotadog_messages").unwrap(), None);
        assert!(matches!(
            store.set("adotadog_messages", "[]"),
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.remove("adotadog_current_user"),
            Err(StoreError::Unavailable)
        ));
    }
}
