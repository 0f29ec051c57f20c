//! Validates a meeting and sends the one-shot join request.
//!
//! Saving the meeting and arming a session are left to the caller.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{MeetingApi, TransportError};

use super::request::{MeetingConfig, MeetingValidator, ValidationError};

/// The backend accepted the join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub title: String,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct MeetingSubmitter {
    api: Arc<dyn MeetingApi>,
    validator: MeetingValidator,
}

impl MeetingSubmitter {
    pub fn new(api: Arc<dyn MeetingApi>, validator: MeetingValidator) -> Self {
        Self { api, validator }
    }

    /// Validate `meeting`, then ask the bot to join it.
    ///
    /// No request is made when validation fails.
    pub async fn submit(&self, meeting: &MeetingConfig) -> Result<Accepted, SubmitError> {
        if let Err(err) = self.validator.validate(meeting) {
            info!(
                "Meeting \"{}\" failed validation ({} issue(s))",
                meeting.title,
                err.issues.len()
            );
            return Err(err.into());
        }

        info!("Requesting bot join for \"{}\"", meeting.title.trim());
        match self.api.join_meeting(meeting).await {
            Ok(()) => {
                info!("Join request for \"{}\" accepted", meeting.title.trim());
                Ok(Accepted {
                    title: meeting.title.trim().to_string(),
                    accepted_at: Utc::now(),
                })
            }
            Err(err) => {
                warn!("Join request for \"{}\" failed: {}", meeting.title.trim(), err);
                Err(err.into())
            }
        }
    }
}
