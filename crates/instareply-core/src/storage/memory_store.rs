use dashmap::DashMap;

use crate::error::StorageError;

use super::store::KeyValueStore;
use super::validate_key;

/// In-memory key-value store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_get_remove() {
        let store = MemoryKeyValueStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("profiles").unwrap(), None);

        store.set("profiles", "[]").unwrap();
        store.set("profiles", "[1]").unwrap();
        assert_eq!(store.get("profiles").unwrap().as_deref(), Some("[1]"));
        assert_eq!(store.len(), 1);

        assert!(store.remove("profiles").unwrap());
        assert!(!store.remove("profiles").unwrap());
    }

    #[test]
    fn test_memory_store_rejects_blank_key() {
        let store = MemoryKeyValueStore::new();
        assert!(matches!(store.set(" ", "x"), Err(StorageError::InvalidKey(_))));
    }
}
