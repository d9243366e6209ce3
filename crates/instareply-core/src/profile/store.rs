use tracing::warn;

use crate::error::{ProfileError, StorageError};
use crate::storage::KeyValueStore;

use super::Profile;

/// Storage key of the serialized profile collection.
pub const PROFILES_KEY: &str = "profiles";
/// Storage key of the current profile id (plain string).
pub const CURRENT_PROFILE_ID_KEY: &str = "currentProfileId";

/// Everything a previous session persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfiles {
    pub profiles: Vec<Profile>,
    pub current_id: Option<String>,
}

/// Persistence of the profile collection and the current-profile pointer.
///
/// The two keys are written independently; nothing couples them.
pub struct ProfileStore {
    backend: Box<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Load what a previous session saved.
    ///
    /// `Ok(None)` when no collection was ever saved. A missing or unreadable
    /// current id is not an error; the collection alone decides.
    pub fn load(&self) -> Result<Option<StoredProfiles>, ProfileError> {
        let Some(raw) = self.backend.get(PROFILES_KEY)? else {
            return Ok(None);
        };
        let profiles: Vec<Profile> = serde_json::from_str(&raw)?;

        let current_id = match self.backend.get(CURRENT_PROFILE_ID_KEY) {
            Ok(id) => id,
            Err(e) => {
                warn!("Failed to read current profile id: {}", e);
                None
            }
        };

        Ok(Some(StoredProfiles {
            profiles,
            current_id,
        }))
    }

    /// Write the profile collection. Failures are logged, not returned.
    pub fn save(&self, profiles: &[Profile]) {
        let json = match serde_json::to_string(profiles) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize profiles: {}", e);
                return;
            }
        };
        if let Err(e) = self.backend.set(PROFILES_KEY, &json) {
            warn!("Failed to save profiles: {}", e);
        }
    }

    /// Write the current profile id. Failures are logged, not returned.
    pub fn save_current_id(&self, id: &str) {
        if let Err(e) = self.backend.set(CURRENT_PROFILE_ID_KEY, id) {
            warn!("Failed to save current profile id: {}", e);
        }
    }

    /// Remove both keys so the next session starts from defaults. Returns
    /// whether anything was stored.
    pub fn clear(&self) -> Result<bool, StorageError> {
        let had_profiles = self.backend.remove(PROFILES_KEY)?;
        let had_current = self.backend.remove(CURRENT_PROFILE_ID_KEY)?;
        Ok(had_profiles || had_current)
    }
}
