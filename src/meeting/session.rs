//! Meeting session lifecycle controller.
//!
//! Tracks one bot session from the accepted join request to the summary:
//! joining → joined → ended → generating → completed
//!
//! Progress comes from polling the backend. Transient poll failures are
//! reported and retried on the next tick; only a failed summary fetch ends a
//! session as `Failed`.

use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{MeetingApi, MeetingSummary, TransportError};

use super::poller::{PollControl, PollExit, StatusPoller};
use super::status::{map_remote_status, SessionResult, SessionState, Stage};

/// Notifications emitted by a running session, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StageChanged(Stage),
    Completed(SessionResult),
    Failed(String),
    /// A single poll failed; the session keeps polling.
    PollFailed(TransportError),
}

/// Callback-style consumer of session events.
pub trait SessionObserver {
    fn on_stage_change(&mut self, stage: Stage);
    fn on_complete(&mut self, result: SessionResult);
    fn on_error(&mut self, error: String);
    fn on_poll_error(&mut self, _error: &TransportError) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a session for \"{0}\" is still running; cancel it before starting another")]
    AlreadyActive(String),
}

struct SessionInner {
    state: SessionState,
    cancelled: bool,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl SessionInner {
    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = events.send(event);
        }
    }

    fn set_stage(&mut self, stage: Stage) {
        if self.state.stage != stage {
            info!(
                "Session \"{}\": {} -> {}",
                self.state.meeting_title.as_deref().unwrap_or_default(),
                self.state.stage.as_str(),
                stage.as_str()
            );
            self.state.stage = stage;
            self.emit(SessionEvent::StageChanged(stage));
        }
    }
}

/// State shared between the polling task, the controller and handles.
///
/// Every mutation happens under `inner` and first checks `cancelled`, and
/// cancellation sets the flag under the same lock. Once `cancel` returns,
/// nothing can change the state or emit another event.
struct SessionShared {
    inner: Mutex<SessionInner>,
    token: CancellationToken,
}

impl SessionShared {
    fn new(title: &str, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            inner: Mutex::new(SessionInner {
                state: SessionState::armed(title),
                cancelled: false,
                events: Some(events),
            }),
            token: CancellationToken::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> SessionState {
        self.lock().state.clone()
    }

    fn title(&self) -> String {
        self.lock().state.meeting_title.clone().unwrap_or_default()
    }

    fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    fn is_running(&self) -> bool {
        let inner = self.lock();
        !inner.cancelled && !inner.state.stage.is_terminal()
    }

    fn cancel(&self) {
        {
            let mut inner = self.lock();
            if inner.cancelled || inner.state.stage.is_terminal() {
                return;
            }
            inner.cancelled = true;
            inner.events = None;
            info!(
                "Session \"{}\" cancelled at stage {}",
                inner.state.meeting_title.as_deref().unwrap_or_default(),
                inner.state.stage.as_str()
            );
        }
        self.token.cancel();
    }

    fn apply_poll(&self, outcome: Result<String, TransportError>) -> PollControl {
        let mut inner = self.lock();
        if inner.cancelled {
            return PollControl::Stop;
        }
        inner.state.last_polled_at = Some(Utc::now());

        match outcome {
            Ok(status) => {
                let stage = map_remote_status(&status);
                inner.state.last_remote_status = Some(status);
                if stage == Stage::Completed {
                    // Announced once the summary is in hand.
                    return PollControl::Stop;
                }
                inner.set_stage(stage);
                PollControl::Continue
            }
            Err(err) => {
                warn!("Status poll failed, retrying next tick: {}", err);
                inner.emit(SessionEvent::PollFailed(err));
                PollControl::Continue
            }
        }
    }

    fn finish(&self, summary: Result<Option<MeetingSummary>, TransportError>) {
        let mut inner = self.lock();
        if inner.cancelled {
            return;
        }

        match summary {
            Ok(summary) => {
                let result = SessionResult {
                    meeting_title: inner.state.meeting_title.clone().unwrap_or_default(),
                    summary,
                    completed_at: Utc::now(),
                };
                if result.summary.is_none() {
                    warn!("Backend reported completion without a summary");
                }
                inner.state.result = Some(result.clone());
                inner.set_stage(Stage::Completed);
                inner.emit(SessionEvent::Completed(result));
            }
            Err(err) => {
                let message = format!("Failed to fetch meeting summary: {err}");
                error!("{}", message);
                inner.state.error = Some(message.clone());
                inner.set_stage(Stage::Failed);
                inner.emit(SessionEvent::Failed(message));
            }
        }

        // Closing the channel lets receivers drain and see the end.
        inner.events = None;
    }
}

async fn drive_session(shared: Arc<SessionShared>, api: Arc<dyn MeetingApi>, interval: Duration) {
    let poller = StatusPoller::new(api.clone(), interval);
    let exit = poller
        .run(&shared.token, |outcome| shared.apply_poll(outcome))
        .await;

    if exit == PollExit::Cancelled || shared.is_cancelled() {
        debug!("Session task stopping after cancellation");
        return;
    }

    let title = shared.title();
    let summary = tokio::select! {
        biased;
        _ = shared.token.cancelled() => return,
        summary = api.fetch_summary(&title) => summary,
    };
    shared.finish(summary);
}

/// Caller's view of one session: state snapshots, events, cancellation.
pub struct SessionHandle {
    shared: Arc<SessionShared>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionHandle {
    pub fn snapshot(&self) -> SessionState {
        self.shared.snapshot()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Stop polling and discard anything still in flight.
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    /// A cloneable cancel switch, e.g. for a Ctrl-C handler.
    pub fn canceller(&self) -> SessionCanceller {
        SessionCanceller {
            shared: self.shared.clone(),
        }
    }

    /// Next event, or `None` once the session is over or cancelled.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if self.shared.is_cancelled() {
            return None;
        }

        let event = tokio::select! {
            biased;
            _ = self.shared.token.cancelled() => None,
            event = self.events.recv() => event,
        };

        if self.shared.is_cancelled() {
            return None;
        }
        event
    }

    /// Feed events to `observer` until the session ends.
    ///
    /// Returns the terminal stage, or `None` if the session was cancelled.
    pub async fn observe<O>(&mut self, observer: &mut O) -> Option<Stage>
    where
        O: SessionObserver + ?Sized,
    {
        while let Some(event) = self.next_event().await {
            match event {
                SessionEvent::StageChanged(stage) => observer.on_stage_change(stage),
                SessionEvent::Completed(result) => {
                    observer.on_complete(result);
                    return Some(Stage::Completed);
                }
                SessionEvent::Failed(error) => {
                    observer.on_error(error);
                    return Some(Stage::Failed);
                }
                SessionEvent::PollFailed(error) => observer.on_poll_error(&error),
            }
        }
        None
    }
}

#[derive(Clone)]
pub struct SessionCanceller {
    shared: Arc<SessionShared>,
}

impl SessionCanceller {
    pub fn cancel(&self) {
        self.shared.cancel();
    }
}

/// Owns the single active session.
pub struct SessionController {
    api: Arc<dyn MeetingApi>,
    poll_interval: Duration,
    active: Mutex<Option<Arc<SessionShared>>>,
}

impl SessionController {
    pub fn new(api: Arc<dyn MeetingApi>, poll_interval: Duration) -> Self {
        Self {
            api,
            poll_interval,
            active: Mutex::new(None),
        }
    }

    /// Arm a session for a meeting whose join request was accepted.
    ///
    /// Must be called from within a tokio runtime; the polling task is spawned
    /// onto it. Fails while another session is still running.
    pub fn start_session(&self, title: &str) -> Result<SessionHandle, SessionError> {
        let mut active = self.lock_active();
        if let Some(current) = active.as_ref() {
            if current.is_running() {
                return Err(SessionError::AlreadyActive(current.title()));
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionShared::new(title, tx));
        shared
            .lock()
            .emit(SessionEvent::StageChanged(Stage::Joining));

        info!(
            "Session \"{}\" armed, polling every {}s",
            title,
            self.poll_interval.as_secs()
        );
        tokio::spawn(drive_session(
            shared.clone(),
            self.api.clone(),
            self.poll_interval,
        ));

        *active = Some(shared.clone());
        Ok(SessionHandle { shared, events: rx })
    }

    /// Cancel the active session, if any, and return to idle.
    pub fn cancel_session(&self) -> bool {
        match self.lock_active().take() {
            Some(session) => {
                session.cancel();
                true
            }
            None => false,
        }
    }

    /// Clear a finished session so the controller reads as idle again.
    pub fn acknowledge(&self) -> bool {
        let mut active = self.lock_active();
        let finished = active
            .as_ref()
            .is_some_and(|session| !session.is_running());
        if finished {
            *active = None;
        }
        finished
    }

    pub fn is_active(&self) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|session| session.is_running())
    }

    /// Current session state; idle when nothing is running or it was cancelled.
    pub fn snapshot(&self) -> SessionState {
        match self.lock_active().as_ref() {
            Some(session) if !session.is_cancelled() => session.snapshot(),
            _ => SessionState::default(),
        }
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Arc<SessionShared>>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meeting::MeetingConfig;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::Notify;
    use tokio::time::{self, Instant};

    const INTERVAL: Duration = Duration::from_secs(10);

    enum Reply {
        Status(&'static str),
        Fail,
        /// Signal `entered`, then hang until `gate` is notified.
        Gated(Arc<Notify>, &'static str),
    }

    struct ScriptedApi {
        replies: Mutex<VecDeque<Reply>>,
        calls: Mutex<Vec<Instant>>,
        entered: Notify,
        summary: Result<Option<MeetingSummary>, TransportError>,
        summary_requests: Mutex<Vec<String>>,
    }

    impl ScriptedApi {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Self::with_summary(
                replies,
                Ok(Some(MeetingSummary {
                    meeting_id: Some("m-1".to_string()),
                    text: "Decided to ship on Friday.".to_string(),
                })),
            )
        }

        fn with_summary(
            replies: Vec<Reply>,
            summary: Result<Option<MeetingSummary>, TransportError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
                entered: Notify::new(),
                summary,
                summary_requests: Mutex::new(Vec::new()),
            })
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MeetingApi for ScriptedApi {
        async fn join_meeting(&self, _meeting: &MeetingConfig) -> Result<(), TransportError> {
            Ok(())
        }

        async fn fetch_status(&self) -> Result<String, TransportError> {
            self.calls.lock().unwrap().push(Instant::now());
            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Status(status)) => Ok(status.to_string()),
                Some(Reply::Fail) => Err(TransportError::Unreachable(
                    "connection reset".to_string(),
                )),
                Some(Reply::Gated(gate, status)) => {
                    self.entered.notify_one();
                    gate.notified().await;
                    Ok(status.to_string())
                }
                None => std::future::pending().await,
            }
        }

        async fn fetch_summary(
            &self,
            meeting_series: &str,
        ) -> Result<Option<MeetingSummary>, TransportError> {
            self.summary_requests
                .lock()
                .unwrap()
                .push(meeting_series.to_string());
            self.summary.clone()
        }
    }

    #[derive(Default)]
    struct Recorder {
        stages: Vec<Stage>,
        completed: Vec<SessionResult>,
        errors: Vec<String>,
        poll_errors: usize,
    }

    impl SessionObserver for Recorder {
        fn on_stage_change(&mut self, stage: Stage) {
            self.stages.push(stage);
        }

        fn on_complete(&mut self, result: SessionResult) {
            self.completed.push(result);
        }

        fn on_error(&mut self, error: String) {
            self.errors.push(error);
        }

        fn on_poll_error(&mut self, _error: &TransportError) {
            self.poll_errors += 1;
        }
    }

    fn controller(api: Arc<ScriptedApi>) -> SessionController {
        SessionController::new(api, INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle() {
        let api = ScriptedApi::new(vec![
            Reply::Status("not started"),
            Reply::Status("Transcription"),
            Reply::Status("summary generation"),
            Reply::Status("completed"),
        ]);
        let controller = controller(api.clone());

        let mut handle = controller.start_session("Standup").unwrap();
        let mut recorder = Recorder::default();
        let outcome = handle.observe(&mut recorder).await;

        assert_eq!(outcome, Some(Stage::Completed));
        assert_eq!(
            recorder.stages,
            vec![
                Stage::Joining,
                Stage::Joined,
                Stage::Ended,
                Stage::Generating,
                Stage::Completed,
            ]
        );
        assert_eq!(recorder.completed.len(), 1);
        assert!(recorder.errors.is_empty());

        let result = &recorder.completed[0];
        assert_eq!(result.meeting_title, "Standup");
        assert_eq!(result.summary_text(), Some("Decided to ship on Friday."));
        assert_eq!(
            *api.summary_requests.lock().unwrap(),
            vec!["Standup".to_string()]
        );

        // No polling after completion.
        time::sleep(INTERVAL * 5).await;
        assert_eq!(api.call_times().len(), 4);
        assert!(handle.next_event().await.is_none());

        let state = controller.snapshot();
        assert_eq!(state.stage, Stage::Completed);
        assert_eq!(state.last_remote_status.as_deref(), Some("completed"));
        assert_eq!(state.result.as_ref(), Some(result));
        assert!(state.last_polled_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecognized_status_keeps_session_alive() {
        let api = ScriptedApi::new(vec![
            Reply::Status("warming up"),
            Reply::Status("not started"),
            Reply::Status("completed"),
        ]);
        let controller = controller(api);

        let mut handle = controller.start_session("Standup").unwrap();
        let mut recorder = Recorder::default();
        handle.observe(&mut recorder).await;

        assert_eq!(
            recorder.stages,
            vec![Stage::Joining, Stage::Joined, Stage::Completed]
        );
        assert_eq!(recorder.completed.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_keeps_stage_and_schedule() {
        let api = ScriptedApi::new(vec![
            Reply::Status("not started"),
            Reply::Fail,
            Reply::Status("Transcription"),
        ]);
        let controller = controller(api.clone());
        let started = Instant::now();
        let mut handle = controller.start_session("Standup").unwrap();

        assert_eq!(
            handle.next_event().await,
            Some(SessionEvent::StageChanged(Stage::Joining))
        );
        assert_eq!(
            handle.next_event().await,
            Some(SessionEvent::StageChanged(Stage::Joined))
        );
        assert!(matches!(
            handle.next_event().await,
            Some(SessionEvent::PollFailed(TransportError::Unreachable(_)))
        ));
        assert_eq!(handle.snapshot().stage, Stage::Joined);
        assert!(handle.snapshot().error.is_none());

        assert_eq!(
            handle.next_event().await,
            Some(SessionEvent::StageChanged(Stage::Ended))
        );

        let calls = api.call_times();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0] - started, INTERVAL);
        assert_eq!(calls[1] - calls[0], INTERVAL);
        assert_eq!(calls[2] - calls[1], INTERVAL);

        controller.cancel_session();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_in_flight_poll() {
        let gate = Arc::new(Notify::new());
        let api = ScriptedApi::new(vec![
            Reply::Status("not started"),
            Reply::Gated(gate.clone(), "Transcription"),
            Reply::Status("summary generation"),
            Reply::Status("completed"),
        ]);
        let controller = controller(api.clone());
        let mut handle = controller.start_session("Standup").unwrap();

        assert_eq!(
            handle.next_event().await,
            Some(SessionEvent::StageChanged(Stage::Joining))
        );
        assert_eq!(
            handle.next_event().await,
            Some(SessionEvent::StageChanged(Stage::Joined))
        );

        // The Ended-triggering poll is now in flight.
        api.entered.notified().await;
        assert!(controller.cancel_session());
        gate.notify_one();

        let mut recorder = Recorder::default();
        assert_eq!(handle.observe(&mut recorder).await, None);
        assert!(recorder.stages.is_empty());
        assert!(recorder.completed.is_empty());
        assert!(recorder.errors.is_empty());

        time::sleep(INTERVAL * 5).await;
        assert_eq!(api.call_times().len(), 2);
        assert!(api.summary_requests.lock().unwrap().is_empty());
        assert!(handle.is_cancelled());
        assert_eq!(handle.snapshot().stage, Stage::Joined);
        assert_eq!(controller.snapshot().stage, Stage::NotStarted);
        assert!(!controller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_from_handle() {
        let api = ScriptedApi::new(vec![Reply::Status("not started")]);
        let controller = controller(api.clone());
        let mut handle = controller.start_session("Standup").unwrap();

        handle.canceller().cancel();
        assert!(handle.next_event().await.is_none());

        time::sleep(INTERVAL * 3).await;
        assert!(api.call_times().is_empty());
        assert!(!controller.is_active());
        // A cancelled session does not block the next one.
        assert!(controller.start_session("Retro").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summary_failure_fails_session() {
        let api = ScriptedApi::with_summary(
            vec![Reply::Status("completed")],
            Err(TransportError::Rejected {
                status: 500,
                message: Some("vector store down".to_string()),
            }),
        );
        let controller = controller(api);
        let mut handle = controller.start_session("Standup").unwrap();

        let mut recorder = Recorder::default();
        assert_eq!(handle.observe(&mut recorder).await, Some(Stage::Failed));
        assert_eq!(recorder.stages, vec![Stage::Joining, Stage::Failed]);
        assert!(recorder.completed.is_empty());
        assert_eq!(recorder.errors.len(), 1);
        assert!(recorder.errors[0].contains("vector store down"));

        let state = handle.snapshot();
        assert_eq!(state.stage, Stage::Failed);
        assert!(state.error.is_some());
        assert!(state.result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_without_summary() {
        let api = ScriptedApi::with_summary(vec![Reply::Status("completed")], Ok(None));
        let controller = controller(api);
        let mut handle = controller.start_session("Standup").unwrap();

        let mut recorder = Recorder::default();
        assert_eq!(handle.observe(&mut recorder).await, Some(Stage::Completed));
        assert_eq!(recorder.completed.len(), 1);
        assert!(recorder.completed[0].summary.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_active_session() {
        let api = ScriptedApi::new(vec![Reply::Status("completed")]);
        let controller = controller(api);

        let mut handle = controller.start_session("Standup").unwrap();
        assert!(controller.is_active());
        assert_eq!(
            controller.start_session("Retro").err(),
            Some(SessionError::AlreadyActive("Standup".to_string()))
        );
        assert!(!controller.acknowledge());

        let mut recorder = Recorder::default();
        handle.observe(&mut recorder).await;
        assert!(!controller.is_active());

        assert!(controller.acknowledge());
        assert_eq!(controller.snapshot(), SessionState::default());
        assert!(controller.start_session("Retro").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_without_session() {
        let api = ScriptedApi::new(Vec::new());
        let controller = controller(api);
        assert!(!controller.cancel_session());
        assert_eq!(controller.snapshot().stage, Stage::NotStarted);
    }
}
