pub mod store;
pub mod memory_store;

#[cfg(feature = "file-backend")]
pub mod file_store;

pub use memory_store::MemoryKeyValueStore;
pub use store::KeyValueStore;

#[cfg(feature = "file-backend")]
pub use file_store::FileKeyValueStore;

use crate::error::StorageError;

/// Reject keys that cannot be stored under any backend.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
