//! The local user's identity.

use crate::store::{keys, KeyValueStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub saved_at: DateTime<Utc>,
}

pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Replace the stored profile.
    ///
    /// `name` must be non-empty once trimmed; callers validate before calling.
    pub fn save_user(&self, name: &str) -> Result<UserProfile> {
        let profile = UserProfile {
            name: name.trim().to_string(),
            saved_at: Utc::now(),
        };
        let payload = serde_json::to_string(&profile)?;
        self.store
            .put(keys::USER_PROFILE, &payload)
            .context("Failed to save user profile")?;
        info!("Saved user profile for {}", profile.name);
        Ok(profile)
    }

    /// The stored profile, or `None` when absent or unreadable.
    pub fn get_user(&self) -> Option<UserProfile> {
        let raw = match self.store.get(keys::USER_PROFILE) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!("User profile unavailable: {:#}", err);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!("Ignoring unreadable user profile: {}", err);
                None
            }
        }
    }

    pub fn has_user(&self) -> bool {
        self.get_user().is_some()
    }

    pub fn clear_user(&self) -> Result<()> {
        self.store
            .remove(keys::USER_PROFILE)
            .context("Failed to clear user profile")?;
        info!("Cleared user profile");
        Ok(())
    }
}
