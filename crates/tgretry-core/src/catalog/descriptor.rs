use serde::{Deserialize, Serialize};

/// How a failure of this kind may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryClass {
    /// The request itself is wrong; sending it again cannot succeed.
    NonRetryable,
    /// Transient upstream failure; retry with exponential backoff.
    RetryableWithBackoff,
    /// Rate limited; upstream says how long to wait.
    RetryableAfterHint,
    /// External state (membership, authorization) must change first.
    Permanent,
}

impl RetryClass {
    pub const ALL: [RetryClass; 4] = [
        RetryClass::NonRetryable,
        RetryClass::RetryableWithBackoff,
        RetryClass::RetryableAfterHint,
        RetryClass::Permanent,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RetryClass::NonRetryable => "non_retryable",
            RetryClass::RetryableWithBackoff => "retryable_with_backoff",
            RetryClass::RetryableAfterHint => "retryable_after_hint",
            RetryClass::Permanent => "permanent",
        }
    }

    /// True for the two classes that are surfaced without any retry.
    pub const fn is_terminal(self) -> bool {
        matches!(self, RetryClass::NonRetryable | RetryClass::Permanent)
    }
}

/// Descriptive metadata for one catalog entry. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub code: String,
    pub description: String,
    #[serde(default)]
    pub common_causes: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    pub remediation: String,
    pub retry_class: RetryClass,
}

impl ErrorDescriptor {
    /// Generic descriptor for failures the catalog does not know about.
    ///
    /// Unknown errors might be transient, so they get backoff retries.
    pub fn unknown() -> Self {
        Self {
            code: super::ErrorKey::UNKNOWN.to_string(),
            description: "Unknown upstream error".to_string(),
            common_causes: vec![
                "Error not described in the catalog".to_string(),
                "New or undocumented upstream failure".to_string(),
            ],
            examples: Vec::new(),
            remediation: "Retry with backoff; if it persists, inspect the raw upstream message"
                .to_string(),
            retry_class: RetryClass::RetryableWithBackoff,
        }
    }
}
