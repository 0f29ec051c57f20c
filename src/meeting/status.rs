//! Session stages and the state snapshot shared with callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::MeetingSummary;

/// Stage of a meeting session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    NotStarted,
    Joining,
    Joined,
    Ended,
    Generating,
    Completed,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Joining => "joining",
            Self::Joined => "joined",
            Self::Ended => "ended",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Short human label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "Not started",
            Self::Joining => "Bot is joining the meeting",
            Self::Joined => "Bot joined, recording",
            Self::Ended => "Meeting ended, preparing transcript",
            Self::Generating => "Generating summary",
            Self::Completed => "Summary ready",
            Self::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Map the backend's free-text progress value to a stage.
///
/// Total over all inputs: anything not listed is read as "still getting
/// there" and lands on `Joining`. Matching ignores case and surrounding
/// whitespace.
pub fn map_remote_status(status: &str) -> Stage {
    match status.trim().to_lowercase().as_str() {
        "not started" => Stage::Joined,
        "transcription" | "preprocessing" => Stage::Ended,
        "summary generation" => Stage::Generating,
        "completed" => Stage::Completed,
        _ => Stage::Joining,
    }
}

/// Payload handed to the caller when a session completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub meeting_title: String,
    pub summary: Option<MeetingSummary>,
    pub completed_at: DateTime<Utc>,
}

impl SessionResult {
    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_ref().map(|summary| summary.text.as_str())
    }
}

/// Snapshot of the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub stage: Stage,
    pub meeting_title: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub last_remote_status: Option<String>,
    pub result: Option<SessionResult>,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            stage: Stage::NotStarted,
            meeting_title: None,
            started_at: None,
            last_polled_at: None,
            last_remote_status: None,
            result: None,
            error: None,
        }
    }
}

impl SessionState {
    pub(crate) fn armed(title: &str) -> Self {
        Self {
            stage: Stage::Joining,
            meeting_title: Some(title.to_string()),
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Seconds since the session was armed.
    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.started_at.map(|started| {
            let elapsed = Utc::now() - started;
            elapsed.num_seconds().max(0) as u64
        })
    }
}
