//! Authored retry-class table.
//!
//! The catalog data is purely descriptive; whether an entry may be retried is
//! decided here, per key, and never inferred from description text.

use super::{ErrorKey, RetryClass};

/// Keys signalling that a group chat moved to a new identifier.
pub const MIGRATION_CODES: [&str; 2] = ["MIGRATE_TO_CHAT_ID", "GROUP_CHAT_MIGRATED"];

/// Retry class for a key, or `None` when the table has no opinion.
pub fn authored_retry_class(key: &ErrorKey) -> Option<RetryClass> {
    match key {
        ErrorKey::Numeric(status) => numeric_class(*status),
        ErrorKey::Named(code) => named_class(code),
    }
}

/// Retry class used when neither the data nor the table names one.
pub fn retry_class_or_default(key: &ErrorKey) -> RetryClass {
    authored_retry_class(key).unwrap_or(RetryClass::RetryableWithBackoff)
}

pub fn is_migration(key: &ErrorKey) -> bool {
    matches!(key, ErrorKey::Named(code) if MIGRATION_CODES.contains(&code.as_str()))
}

fn numeric_class(status: u16) -> Option<RetryClass> {
    let class = match status {
        400 | 405 | 406 | 413 | 414 | 415 | 422 => RetryClass::NonRetryable,
        401 | 402 | 403 | 404 => RetryClass::Permanent,
        429 => RetryClass::RetryableAfterHint,
        409 | 500 | 502 | 503 | 504 => RetryClass::RetryableWithBackoff,
        _ => return None,
    };
    Some(class)
}

fn named_class(code: &str) -> Option<RetryClass> {
    let class = match code {
        "MESSAGE_TOO_LONG"
        | "INVALID_FILE_ID"
        | "CANNOT_PARSE_ENTITIES"
        | "BUTTON_DATA_INVALID"
        | "BUTTON_URL_INVALID"
        | "PHONE_NUMBER_INVALID"
        | "PHOTO_INVALID_DIMENSIONS"
        | "STICKER_SET_INVALID"
        | "MESSAGE_ID_INVALID"
        | "REPLY_MESSAGE_NOT_FOUND"
        | "QUERY_TOO_OLD"
        | "INLINE_RESULT_EXPIRED"
        | "WEBHOOK_NOT_SET"
        | "MIGRATE_TO_CHAT_ID"
        | "GROUP_CHAT_MIGRATED" => RetryClass::NonRetryable,

        "BOT_BLOCKED"
        | "BOT_KICKED"
        | "CHAT_NOT_FOUND"
        | "USER_NOT_FOUND"
        | "MESSAGE_NOT_FOUND"
        | "PEER_ID_INVALID"
        | "CHAT_ADMIN_REQUIRED"
        | "CANNOT_INITIATE_CONVERSATION" => RetryClass::Permanent,

        "FLOOD_CONTROL" | "FLOOD_WAIT" | "TOO_MANY_REQUESTS" => RetryClass::RetryableAfterHint,

        "NETWORK_ERROR" | "WEBHOOK_CONFLICT" | "UNKNOWN" => RetryClass::RetryableWithBackoff,

        _ => return None,
    };
    Some(class)
}
