//! Fixed-interval polling of the backend status route.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{MeetingApi, TransportError};

/// What the poll handler wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollControl {
    Continue,
    Stop,
}

/// Why [`StatusPoller::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    /// The handler asked to stop.
    Stopped,
    /// The token was cancelled; any in-flight request was dropped.
    Cancelled,
}

pub struct StatusPoller {
    api: Arc<dyn MeetingApi>,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn MeetingApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Poll until `on_poll` returns [`PollControl::Stop`] or `cancel` fires.
    ///
    /// The first request goes out one interval after the call. A request is
    /// always awaited before the next tick is taken, so polls never overlap;
    /// a slow request pushes the schedule back instead of bunching ticks.
    pub async fn run<F>(&self, cancel: &CancellationToken, mut on_poll: F) -> PollExit
    where
        F: FnMut(Result<String, TransportError>) -> PollControl,
    {
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollExit::Cancelled,
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PollExit::Cancelled,
                outcome = self.api.fetch_status() => outcome,
            };

            if let Ok(status) = &outcome {
                debug!("Status poll #{}: {:?}", attempt, status);
            }

            if on_poll(outcome) == PollControl::Stop {
                return PollExit::Stopped;
            }
        }
    }
}
