//! The surface the front end talks to.
//!
//! Wires the submitter, the local stores and the session controller together:
//! submit → save to history → arm session.

use anyhow::{bail, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{HttpMeetingApi, MeetingApi, TransportError};
use crate::config::Config;
use crate::history::{MeetingHistory, StoredMeeting};
use crate::meeting::{
    Accepted, MeetingConfig, MeetingSubmitter, MeetingValidator, SessionController, SessionError,
    SessionHandle, SessionState, SubmitError,
};
use crate::profile::{ProfileStore, UserProfile};
use crate::store::{FileStore, KeyValueStore};

/// A join request that went through.
#[derive(Debug, Clone)]
pub struct Submission {
    pub accepted: Accepted,
    pub saved: StoredMeeting,
    /// False when the history could not be written; the meeting is then only
    /// remembered until the process exits.
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub struct MeetingService {
    api: Arc<dyn MeetingApi>,
    submitter: MeetingSubmitter,
    history: MeetingHistory,
    profiles: ProfileStore,
    sessions: SessionController,
    /// Title of a join whose request is still in flight.
    pending_join: Mutex<Option<String>>,
}

/// Holds the session slot while a join request is in flight.
struct PendingJoin<'a> {
    slot: &'a Mutex<Option<String>>,
}

impl Drop for PendingJoin<'_> {
    fn drop(&mut self) {
        *lock_slot(self.slot) = None;
    }
}

fn lock_slot(slot: &Mutex<Option<String>>) -> MutexGuard<'_, Option<String>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MeetingService {
    pub fn new(
        api: Arc<dyn MeetingApi>,
        store: Arc<dyn KeyValueStore>,
        validator: MeetingValidator,
        poll_interval: Duration,
        history_limit: usize,
    ) -> Self {
        Self {
            submitter: MeetingSubmitter::new(api.clone(), validator),
            history: MeetingHistory::with_limit(store.clone(), history_limit),
            profiles: ProfileStore::new(store),
            sessions: SessionController::new(api.clone(), poll_interval),
            pending_join: Mutex::new(None),
            api,
        }
    }

    /// Service backed by the HTTP backend and the on-disk store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = HttpMeetingApi::new(&config.api.base_url, config.api.request_timeout())?;
        let store = FileStore::open_default()?;
        let validator = MeetingValidator::new(&config.meetings.allowed_hosts)?;

        info!(
            "Meeting backend at {}, store at {:?}",
            api.base_url(),
            store.dir()
        );

        Ok(Self::new(
            Arc::new(api),
            Arc::new(store),
            validator,
            config.api.poll_interval(),
            config.history.limit,
        ))
    }

    /// Validate and submit a meeting, then remember it in the history.
    pub async fn submit_meeting(&self, meeting: &MeetingConfig) -> Result<Submission, SubmitError> {
        let accepted = self.submitter.submit(meeting).await?;
        let owner = self.profiles.get_user().map(|profile| profile.name);

        let (saved, persisted) =
            match self
                .history
                .save_meeting(&meeting.title, &meeting.email, owner.as_deref())
            {
                Ok(saved) => (saved, true),
                Err(err) => {
                    warn!("{}", err);
                    (err.meeting, false)
                }
            };

        Ok(Submission {
            accepted,
            saved,
            persisted,
        })
    }

    /// Submit a meeting and start following the bot's progress.
    ///
    /// Refused up front, with no request sent, while another session runs
    /// or another join is still waiting on the backend.
    pub async fn join_meeting(
        &self,
        meeting: &MeetingConfig,
    ) -> Result<(Submission, SessionHandle), JoinError> {
        let _pending = self.claim_join(&meeting.title)?;

        let submission = self.submit_meeting(meeting).await?;
        let handle = self.sessions.start_session(&submission.accepted.title)?;
        Ok((submission, handle))
    }

    pub fn start_session(&self, title: &str) -> Result<SessionHandle, SessionError> {
        if let Some(pending) = lock_slot(&self.pending_join).as_ref() {
            return Err(SessionError::AlreadyActive(pending.clone()));
        }
        self.sessions.start_session(title)
    }

    /// Reserve the session slot; released when the guard drops.
    fn claim_join(&self, title: &str) -> Result<PendingJoin<'_>, SessionError> {
        let mut slot = lock_slot(&self.pending_join);
        if let Some(pending) = slot.as_ref() {
            return Err(SessionError::AlreadyActive(pending.clone()));
        }
        if self.sessions.is_active() {
            let current = self.sessions.snapshot();
            return Err(SessionError::AlreadyActive(
                current.meeting_title.unwrap_or_default(),
            ));
        }

        *slot = Some(title.to_string());
        Ok(PendingJoin {
            slot: &self.pending_join,
        })
    }

    pub fn cancel_session(&self) -> bool {
        self.sessions.cancel_session()
    }

    pub fn acknowledge_session(&self) -> bool {
        self.sessions.acknowledge()
    }

    pub fn session_snapshot(&self) -> SessionState {
        self.sessions.snapshot()
    }

    /// One-off read of the backend's progress text.
    pub async fn remote_status(&self) -> Result<String, TransportError> {
        self.api.fetch_status().await
    }

    pub fn list_saved_meetings(&self) -> Vec<StoredMeeting> {
        self.history.list_meetings()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.profiles.get_user()
    }

    pub fn set_current_user(&self, name: &str) -> Result<UserProfile> {
        if name.trim().is_empty() {
            bail!("Name cannot be empty");
        }
        self.profiles.save_user(name)
    }

    pub fn clear_current_user(&self) -> Result<()> {
        self.profiles.clear_user()
    }
}
