//! HTTP client for the meeting bot backend.
//!
//! Provides methods for asking the bot to join a meeting, polling its
//! progress, and retrieving the summary once it is done.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::error::TransportError;
use super::{MeetingApi, MeetingSummary};
use crate::meeting::MeetingConfig;

/// Client for the `/api/...` routes of the backend.
pub struct HttpMeetingApi {
    client: reqwest::Client,
    base_url: String,
}

/// Body of the latest-summary endpoint.
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    meeting_id: Option<String>,
    summary: Option<String>,
}

impl HttpMeetingApi {
    /// Create a new client with the given base URL.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the body of a 2xx answer.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|err| TransportError::unreachable(&err))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::unreachable(&err))?;

        if !status.is_success() {
            return Err(TransportError::rejected(status.as_u16(), &body));
        }

        Ok(body)
    }
}

#[async_trait]
impl MeetingApi for HttpMeetingApi {
    async fn join_meeting(&self, meeting: &MeetingConfig) -> Result<(), TransportError> {
        debug!("Requesting bot join for \"{}\"", meeting.title);
        self.send(self.client.post(self.url("/api/join_meeting")).json(meeting))
            .await?;
        Ok(())
    }

    async fn fetch_status(&self) -> Result<String, TransportError> {
        let body = self
            .send(self.client.get(self.url("/api/get_status")))
            .await?;
        Ok(parse_status_body(&body))
    }

    async fn fetch_summary(
        &self,
        meeting_series: &str,
    ) -> Result<Option<MeetingSummary>, TransportError> {
        let body = self
            .send(
                self.client
                    .get(self.url("/api/get_latest_meeting_summary"))
                    .query(&[("meeting_series", meeting_series)]),
            )
            .await?;

        let parsed: SummaryResponse = serde_json::from_str(&body)
            .map_err(|err| TransportError::Malformed(format!("summary response: {err}")))?;

        Ok(parsed.summary.map(|text| MeetingSummary {
            meeting_id: parsed.meeting_id,
            text,
        }))
    }
}

/// Extract the status text from a `get_status` body.
///
/// The documented shape is `{"status": "..."}`, but the backend also answers
/// with a bare JSON string, so both are accepted, as is plain text.
pub fn parse_status_body(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("status") {
            Some(Value::String(status)) => status.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        },
        Ok(Value::String(status)) => status,
        Ok(other) => other.to_string(),
        Err(_) => body.trim().to_string(),
    }
}
