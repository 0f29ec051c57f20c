//! Meeting bot sessions.
//!
//! Validates what the user typed, asks the backend to send its bot into the
//! call, then follows the bot's progress until a summary comes back.

pub mod poller;
pub mod request;
pub mod session;
pub mod status;
pub mod submitter;

pub use poller::{PollControl, PollExit, StatusPoller};
pub use request::{
    Field, FieldIssue, MeetingConfig, MeetingValidator, ValidationError, DEFAULT_ALLOWED_HOSTS,
};
pub use session::{
    SessionCanceller, SessionController, SessionError, SessionEvent, SessionHandle,
    SessionObserver,
};
pub use status::{map_remote_status, SessionResult, SessionState, Stage};
pub use submitter::{Accepted, MeetingSubmitter, SubmitError};
