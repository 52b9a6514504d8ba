//! Failure types flowing through the retry engine.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::catalog::{is_migration, ErrorDescriptor, ErrorKey, RetryClass};

/// An upstream failure as reported by one attempt, before classification.
///
/// Mirrors what the Bot API hands back: an HTTP status, sometimes a machine
/// code, a human description and optional `retry_after` / `migrate_to_chat_id`
/// parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFailure {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub retry_after: Option<u64>,
    pub migrate_to_chat_id: Option<i64>,
}

impl RawFailure {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn named(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            ..Self::default()
        }
    }

    /// Transport-level failure (no response at all).
    pub fn network(message: impl Into<String>) -> Self {
        Self::named("NETWORK_ERROR", message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    pub fn with_migrate_to(mut self, chat_id: i64) -> Self {
        self.migrate_to_chat_id = Some(chat_id);
        self
    }
}

impl fmt::Display for RawFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, self.status) {
            (Some(code), Some(status)) => write!(f, "{} (HTTP {})", code, status)?,
            (Some(code), None) => write!(f, "{}", code)?,
            (None, Some(status)) => write!(f, "HTTP {}", status)?,
            (None, None) => write!(f, "upstream error")?,
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for RawFailure {}

/// A failure resolved against the catalog. Created once per failure event and
/// never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedError {
    pub key: ErrorKey,
    pub descriptor: ErrorDescriptor,
    /// Present only when upstream explicitly asked us to wait.
    pub retry_after_secs: Option<u64>,
    pub migrate_to_chat_id: Option<i64>,
    pub raw_message: String,
    pub occurred_at: DateTime<Utc>,
}

impl ClassifiedError {
    pub fn code(&self) -> &str {
        &self.descriptor.code
    }

    pub fn retry_class(&self) -> RetryClass {
        self.descriptor.retry_class
    }

    pub fn remediation(&self) -> &str {
        &self.descriptor.remediation
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_secs.map(Duration::from_secs)
    }

    pub fn is_unknown(&self) -> bool {
        self.key.is_unknown()
    }

    /// True when upstream says the chat moved, whether or not it named the
    /// new id.
    pub fn is_migration(&self) -> bool {
        is_migration(&self.key) || self.migrate_to_chat_id.is_some()
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.descriptor.code, self.descriptor.description)?;
        if !self.raw_message.is_empty() {
            write!(f, " ({})", self.raw_message)?;
        }
        write!(f, "; remediation: {}", self.descriptor.remediation)
    }
}

impl std::error::Error for ClassifiedError {}

/// Terminal outcome of a retry sequence that did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// The policy gave up; carries the last classified upstream failure.
    #[error("gave up: {0}")]
    GaveUp(ClassifiedError),

    /// The caller cancelled the sequence.
    #[error("retry sequence cancelled{}", last_error_suffix(.last_error))]
    Cancelled { last_error: Option<ClassifiedError> },

    /// The overall wall-clock budget ran out.
    #[error("retry budget of {budget:?} exhausted after {elapsed:?}{}", last_error_suffix(.last_error))]
    DeadlineExceeded {
        budget: Duration,
        elapsed: Duration,
        last_error: Option<ClassifiedError>,
    },
}

impl RetryError {
    /// The last classified upstream failure, if any attempt failed.
    pub fn last_error(&self) -> Option<&ClassifiedError> {
        match self {
            RetryError::GaveUp(e) => Some(e),
            RetryError::Cancelled { last_error } | RetryError::DeadlineExceeded { last_error, .. } => {
                last_error.as_ref()
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    pub fn into_classified(self) -> Option<ClassifiedError> {
        match self {
            RetryError::GaveUp(e) => Some(e),
            RetryError::Cancelled { last_error } | RetryError::DeadlineExceeded { last_error, .. } => {
                last_error
            }
        }
    }
}

fn last_error_suffix(last: &Option<ClassifiedError>) -> String {
    match last {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_failure_display() {
        assert_eq!(
            RawFailure::http(503, "Service unavailable").to_string(),
            "HTTP 503: Service unavailable"
        );
        assert_eq!(
            RawFailure::named("BOT_BLOCKED", "").with_status(403).to_string(),
            "BOT_BLOCKED (HTTP 403)"
        );
        assert_eq!(RawFailure::default().to_string(), "upstream error");
    }

    #[test]
    fn network_failure_uses_network_code() {
        let raw = RawFailure::network("connection reset");
        assert_eq!(raw.code.as_deref(), Some("NETWORK_ERROR"));
        assert!(raw.status.is_none());
    }

    #[test]
    fn classified_display_includes_remediation() {
        let err = ClassifiedError {
            key: ErrorKey::named("BOT_BLOCKED"),
            descriptor: ErrorDescriptor {
                code: "BOT_BLOCKED".to_string(),
                description: "Bot was blocked by the user".to_string(),
                common_causes: Vec::new(),
                examples: Vec::new(),
                remediation: "Cannot send messages to blocked users".to_string(),
                retry_class: RetryClass::Permanent,
            },
            retry_after_secs: None,
            migrate_to_chat_id: None,
            raw_message: "Forbidden: bot was blocked by the user".to_string(),
            occurred_at: Utc::now(),
        };
        let text = err.to_string();
        assert!(text.starts_with("BOT_BLOCKED: Bot was blocked by the user"));
        assert!(text.ends_with("remediation: Cannot send messages to blocked users"));

        let gave_up = RetryError::GaveUp(err.clone());
        assert!(gave_up.to_string().contains("Cannot send messages to blocked users"));
        assert_eq!(gave_up.last_error(), Some(&err));
    }

    #[test]
    fn cancelled_without_failure_has_no_last_error() {
        let e = RetryError::Cancelled { last_error: None };
        assert!(e.is_cancelled());
        assert_eq!(e.to_string(), "retry sequence cancelled");
        assert!(e.into_classified().is_none());
    }
}
