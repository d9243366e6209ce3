use tracing::{debug, info, warn};

use crate::util::unix_millis;

use super::store::{ProfileStore, StoredProfiles};
use super::{NewProfile, Profile, ProfileUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Initialized,
}

/// Session-owned profile state: the collection plus the active profile.
///
/// Mutations before [`ProfileContext::init`] stay in memory so that defaults
/// never clobber data a previous session persisted. After `init` every
/// mutation writes both storage keys.
pub struct ProfileContext {
    store: ProfileStore,
    profiles: Vec<Profile>,
    current: Option<Profile>,
    phase: Phase,
}

impl ProfileContext {
    pub fn new(store: ProfileStore) -> Self {
        let default = Profile::default_profile();
        Self {
            store,
            profiles: vec![default.clone()],
            current: Some(default),
            phase: Phase::Uninitialized,
        }
    }

    /// Load persisted state. Runs once per session; later calls do nothing.
    pub fn init(&mut self) {
        if self.phase == Phase::Initialized {
            return;
        }

        match self.store.load() {
            Ok(Some(StoredProfiles {
                profiles,
                current_id,
            })) => {
                info!("Loaded {} stored profile(s)", profiles.len());
                self.profiles = profiles;
                if let Some(id) = current_id {
                    match self.profiles.iter().find(|p| p.id == id) {
                        Some(found) => self.current = Some(found.clone()),
                        None => debug!("Stored current profile {} no longer exists", id),
                    }
                }
            }
            Ok(None) => debug!("No stored profiles, starting from defaults"),
            Err(e) => warn!("Failed to parse stored profiles: {}", e),
        }

        self.phase = Phase::Initialized;
        self.persist();
    }

    /// End the session with a final write of both keys.
    pub fn teardown(self) {
        self.persist();
        debug!("Profile context torn down");
    }

    pub fn is_initialized(&self) -> bool {
        self.phase == Phase::Initialized
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.current.as_ref()
    }

    pub fn find(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Make `profile` the active one. Membership in the collection is the
    /// caller's concern.
    pub fn set_current_profile(&mut self, profile: Profile) {
        self.current = Some(profile);
        self.persist();
    }

    /// Merge `update` into the profile with `id`.
    ///
    /// Unknown ids leave the collection untouched. The active profile is
    /// refreshed with the same merge whenever its id matches, so readers see
    /// the change immediately.
    pub fn update_profile(&mut self, id: &str, update: &ProfileUpdate) {
        if let Some(entry) = self.profiles.iter_mut().find(|p| p.id == id) {
            update.apply(entry);
        }
        if let Some(current) = self.current.as_mut().filter(|c| c.id == id) {
            update.apply(current);
        }
        self.persist();
    }

    /// Append a new profile with a fresh time-based id. It does not become
    /// current.
    pub fn create_profile(&mut self, fields: NewProfile) -> Profile {
        let profile = fields.into_profile(self.next_id());
        self.profiles.push(profile.clone());
        self.persist();
        profile
    }

    /// Remove the profile with `id`; returns whether one was removed.
    ///
    /// Deleting the active profile moves current to the first profile left
    /// after removal, or to the built-in default when none is left.
    pub fn delete_profile(&mut self, id: &str) -> bool {
        let before = self.profiles.len();
        self.profiles.retain(|p| p.id != id);
        let removed = self.profiles.len() != before;

        if self.current.as_ref().is_some_and(|c| c.id == id) {
            let next = self
                .profiles
                .first()
                .cloned()
                .unwrap_or_else(Profile::default_profile);
            debug!("Deleted current profile {}, switching to {}", id, next.id);
            self.current = Some(next);
        }

        self.persist();
        removed
    }

    fn next_id(&self) -> String {
        let mut millis = unix_millis();
        loop {
            let id = format!("profile-{}", millis);
            if self.find(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }

    fn persist(&self) {
        if self.phase != Phase::Initialized {
            return;
        }
        self.store.save(&self.profiles);
        if let Some(current) = &self.current {
            self.store.save_current_id(&current.id);
        }
    }
}
