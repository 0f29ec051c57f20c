//! Recently used meeting configurations.
//!
//! Keeps a bounded, most-recent-first list keyed by `(title, email)`. The
//! meeting password never reaches this module: records are built from the
//! title and email only.

use crate::store::{keys, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// A meeting the user joined before, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMeeting {
    pub id: String,
    pub title: String,
    pub email: String,
    pub saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

impl StoredMeeting {
    fn new(title: &str, email: &str, owner_name: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            email: email.trim().to_string(),
            saved_at: Utc::now(),
            owner_name: owner_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from),
        }
    }

    fn same_key(&self, other: &StoredMeeting) -> bool {
        self.title == other.title && self.email == other.email
    }
}

/// The record was accepted but could not be written to storage.
///
/// The in-memory history still contains it for the rest of the process.
#[derive(Debug, Error)]
#[error("meeting \"{}\" kept for this session only: {source}", meeting.title)]
pub struct PersistError {
    pub meeting: StoredMeeting,
    #[source]
    pub source: anyhow::Error,
}

pub struct MeetingHistory {
    store: Arc<dyn KeyValueStore>,
    limit: usize,
    cache: Mutex<Option<Vec<StoredMeeting>>>,
}

impl MeetingHistory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_limit(store, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self {
            store,
            limit: limit.max(1),
            cache: Mutex::new(None),
        }
    }

    /// Record a meeting as most recently used.
    ///
    /// Any earlier record with the same title and email is dropped, and the
    /// list is cut back to the configured limit before it is written out.
    pub fn save_meeting(
        &self,
        title: &str,
        email: &str,
        owner_name: Option<&str>,
    ) -> Result<StoredMeeting, PersistError> {
        let record = StoredMeeting::new(title, email, owner_name);

        let mut cache = self.lock_cache();
        let mut meetings = cache.take().unwrap_or_else(|| self.load());
        meetings.retain(|existing| !existing.same_key(&record));
        meetings.insert(0, record.clone());
        meetings.truncate(self.limit);

        let written = self.persist(&meetings);
        *cache = Some(meetings);

        match written {
            Ok(()) => {
                info!("Saved meeting \"{}\" to history", record.title);
                Ok(record)
            }
            Err(source) => {
                warn!(
                    "Failed to persist meeting history, keeping it in memory: {:#}",
                    source
                );
                Err(PersistError {
                    meeting: record,
                    source,
                })
            }
        }
    }

    /// Saved meetings, most recent first. Unreadable storage yields an empty list.
    pub fn list_meetings(&self) -> Vec<StoredMeeting> {
        let mut cache = self.lock_cache();
        if let Some(meetings) = cache.as_ref() {
            return meetings.clone();
        }
        let meetings = self.load();
        *cache = Some(meetings.clone());
        meetings
    }

    fn load(&self) -> Vec<StoredMeeting> {
        let raw = match self.store.get(keys::MEETING_HISTORY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!("Meeting history unavailable: {:#}", err);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<StoredMeeting>>(&raw) {
            Ok(meetings) => {
                debug!("Loaded {} saved meetings", meetings.len());
                meetings
            }
            Err(err) => {
                warn!("Ignoring unreadable meeting history: {}", err);
                Vec::new()
            }
        }
    }

    fn persist(&self, meetings: &[StoredMeeting]) -> anyhow::Result<()> {
        let payload = serde_json::to_string(meetings)?;
        self.store.put(keys::MEETING_HISTORY, &payload)
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<Vec<StoredMeeting>>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
