//! Remote meeting backend.
//!
//! The bot that joins calls, transcribes and summarizes lives behind three
//! HTTP routes:
//! - `POST /api/join_meeting`
//! - `GET  /api/get_status`
//! - `GET  /api/get_latest_meeting_summary`

pub mod client;
pub mod error;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::meeting::MeetingConfig;

pub use client::HttpMeetingApi;
pub use error::TransportError;

/// Summary produced by the backend for a finished meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub meeting_id: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait MeetingApi: Send + Sync {
    /// Ask the bot to join and record a meeting.
    async fn join_meeting(&self, meeting: &MeetingConfig) -> Result<(), TransportError>;

    /// Raw progress text of the current session.
    async fn fetch_status(&self) -> Result<String, TransportError>;

    /// Latest summary for a meeting series, `None` when the backend has none.
    async fn fetch_summary(
        &self,
        meeting_series: &str,
    ) -> Result<Option<MeetingSummary>, TransportError>;
}
