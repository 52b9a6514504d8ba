//! Resolve raw upstream failures to exactly one catalog entry.

use chrono::Utc;

use crate::catalog::{ErrorCatalog, ErrorKey};

use super::error::{ClassifiedError, RawFailure};

/// Maps raw failures onto a catalog. Pure and total: every input produces a
/// `ClassifiedError`, falling back to `UNKNOWN` when nothing matches.
#[derive(Debug, Clone, Copy)]
pub struct ErrorClassifier<'c> {
    catalog: &'c ErrorCatalog,
}

impl Default for ErrorClassifier<'static> {
    fn default() -> Self {
        Self::new(ErrorCatalog::builtin())
    }
}

impl<'c> ErrorClassifier<'c> {
    pub fn new(catalog: &'c ErrorCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'c ErrorCatalog {
        self.catalog
    }

    /// Resolve the catalog key for a failure.
    ///
    /// A textual code wins over the numeric status: the API often pairs a
    /// generic status with a specific reason, and the reason is authoritative.
    pub fn resolve_key(&self, status: Option<u16>, code: Option<&str>) -> ErrorKey {
        if let Some(code) = code {
            let key = ErrorKey::named(code);
            if self.catalog.contains(&key) {
                return key;
            }
        }
        if let Some(status) = status {
            let key = ErrorKey::Numeric(status);
            if self.catalog.contains(&key) {
                return key;
            }
        }
        ErrorKey::unknown()
    }

    pub fn classify(
        &self,
        status: Option<u16>,
        code: Option<&str>,
        message: &str,
        retry_after: Option<u64>,
    ) -> ClassifiedError {
        let key = self.resolve_key(status, code);
        let descriptor = self
            .catalog
            .lookup(&key)
            .unwrap_or_else(|| self.catalog.unknown())
            .clone();
        if key.is_unknown() {
            tracing::debug!(
                "no catalog entry for status={:?} code={:?}; using UNKNOWN",
                status,
                code
            );
        }
        ClassifiedError {
            key,
            descriptor,
            retry_after_secs: retry_after,
            migrate_to_chat_id: None,
            raw_message: message.to_string(),
            occurred_at: Utc::now(),
        }
    }

    pub fn classify_failure(&self, raw: &RawFailure) -> ClassifiedError {
        let mut classified = self.classify(
            raw.status,
            raw.code.as_deref(),
            &raw.message,
            raw.retry_after,
        );
        classified.migrate_to_chat_id = raw.migrate_to_chat_id;
        classified
    }
}
