//! Meeting details entered by the user and their validation.

use anyhow::Result;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Platforms the bot can join out of the box.
pub const DEFAULT_ALLOWED_HOSTS: [&str; 3] = ["meet.google.com", "zoom.us", "teams.microsoft.com"];

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// What the bot needs to join a call. Serializes to the join request body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingConfig {
    pub title: String,
    pub link: String,
    pub email: String,
    pub password: String,
}

impl MeetingConfig {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for MeetingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeetingConfig")
            .field("title", &self.title)
            .field("link", &self.link)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Link,
    Email,
    Password,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Link => "link",
            Self::Email => "email",
            Self::Password => "password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: Field,
    pub reason: String,
}

/// Every problem found in a [`MeetingConfig`], in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid meeting details: {}", describe_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn has_issue(&self, field: Field) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }

    pub fn fields(&self) -> Vec<Field> {
        self.issues.iter().map(|issue| issue.field).collect()
    }
}

fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field.as_str(), issue.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub struct MeetingValidator {
    allowed_hosts: Vec<String>,
    email_regex: Regex,
}

impl MeetingValidator {
    pub fn new<I, S>(allowed_hosts: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_hosts = allowed_hosts
            .into_iter()
            .map(|host| host.as_ref().trim().trim_end_matches('.').to_ascii_lowercase())
            .filter(|host| !host.is_empty())
            .collect();
        let email_regex = Regex::new(EMAIL_PATTERN)?;

        Ok(Self {
            allowed_hosts,
            email_regex,
        })
    }

    pub fn with_default_hosts() -> Result<Self> {
        Self::new(DEFAULT_ALLOWED_HOSTS)
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }

    /// Check every field and report all failures at once.
    pub fn validate(&self, meeting: &MeetingConfig) -> Result<(), ValidationError> {
        let mut issues = Vec::new();
        let mut issue = |field: Field, reason: &str| {
            issues.push(FieldIssue {
                field,
                reason: reason.to_string(),
            })
        };

        if meeting.title.trim().is_empty() {
            issue(Field::Title, "Meeting title is required");
        }

        if let Err(reason) = self.check_link(meeting.link.trim()) {
            issue(Field::Link, reason);
        }

        let email = meeting.email.trim();
        if email.is_empty() {
            issue(Field::Email, "Email is required");
        } else if !self.email_regex.is_match(email) {
            issue(Field::Email, "Email must look like name@domain.tld");
        }

        if meeting.password.trim().is_empty() {
            issue(Field::Password, "Password is required");
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Exact match, or a subdomain of an allowed host (`us02web.zoom.us`).
    pub fn is_allowed_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            host == *allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    fn check_link(&self, link: &str) -> Result<(), &'static str> {
        if link.is_empty() {
            return Err("Meeting link is required");
        }

        let url = Url::parse(link).map_err(|_| "Meeting link is not a valid URL")?;
        match url.host_str() {
            Some(host) if self.is_allowed_host(host) => Ok(()),
            _ => Err("Meeting link must be a Google Meet, Zoom or Microsoft Teams URL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> MeetingValidator {
        MeetingValidator::with_default_hosts().unwrap()
    }

    fn valid_meeting() -> MeetingConfig {
        MeetingConfig::new(
            "Standup",
            "https://meet.google.com/abc-defg-hij",
            "bot@example.com",
            "hunter2",
        )
    }

    #[test]
    fn test_valid_meeting_passes() {
        assert!(validator().validate(&valid_meeting()).is_ok());
    }

    #[test]
    fn test_all_allowed_platforms() {
        let validator = validator();
        for link in [
            "https://meet.google.com/abc-defg-hij",
            "https://zoom.us/j/123456789",
            "https://us02web.zoom.us/j/123456789?pwd=abc",
            "https://teams.microsoft.com/l/meetup-join/xyz",
            "https://MEET.GOOGLE.COM/abc",
        ] {
            let mut meeting = valid_meeting();
            meeting.link = link.to_string();
            assert!(validator.validate(&meeting).is_ok(), "{link} should be accepted");
        }
    }

    #[test]
    fn test_rejects_other_hosts() {
        let validator = validator();
        for link in [
            "https://example.com/meeting",
            "https://notzoom.us/j/1",
            "https://zoom.us.evil.com/j/1",
            "mailto:someone@zoom.us",
        ] {
            let mut meeting = valid_meeting();
            meeting.link = link.to_string();
            let err = validator.validate(&meeting).unwrap_err();
            assert_eq!(err.fields(), vec![Field::Link], "{link} should be rejected");
        }
    }

    #[test]
    fn test_rejects_unparseable_link() {
        let mut meeting = valid_meeting();
        meeting.link = "meet.google.com/abc".to_string();
        let err = validator().validate(&meeting).unwrap_err();
        assert_eq!(err.issues[0].reason, "Meeting link is not a valid URL");
    }

    #[test]
    fn test_email_shapes() {
        let validator = validator();
        for (email, ok) in [
            ("a@b.co", true),
            ("first.last@sub.example.org", true),
            ("no-at-sign.com", false),
            ("two@@example.com", false),
            ("a@nodot", false),
            ("spaced name@example.com", false),
        ] {
            let mut meeting = valid_meeting();
            meeting.email = email.to_string();
            assert_eq!(validator.validate(&meeting).is_ok(), ok, "{email}");
        }
    }

    #[test]
    fn test_collects_every_issue() {
        let meeting = MeetingConfig::new("   ", "https://example.com", "nope", "");
        let err = validator().validate(&meeting).unwrap_err();
        assert_eq!(
            err.fields(),
            vec![Field::Title, Field::Link, Field::Email, Field::Password]
        );

        let message = err.to_string();
        assert!(message.starts_with("invalid meeting details: title:"));
        assert!(message.contains("password: Password is required"));
    }

    #[test]
    fn test_custom_host_list() {
        let validator = MeetingValidator::new(["Webex.com."]).unwrap();
        assert_eq!(validator.allowed_hosts(), ["webex.com".to_string()]);
        assert!(validator.is_allowed_host("company.webex.com"));
        assert!(!validator.is_allowed_host("zoom.us"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", valid_meeting());
        assert!(rendered.contains("Standup"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_join_payload_shape() {
        let value = serde_json::to_value(valid_meeting()).unwrap();
        assert_eq!(value["title"], "Standup");
        assert_eq!(value["link"], "https://meet.google.com/abc-defg-hij");
        assert_eq!(value["email"], "bot@example.com");
        assert_eq!(value["password"], "hunter2");
    }
}
