//! Parse Bot API error bodies into [`RawFailure`]s.
//!
//! The API answers failures with a JSON body such as
//! `{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}`,
//! plus optional `parameters` (`retry_after`, `migrate_to_chat_id`). It has no
//! machine-readable reason, so the well-known descriptions are mapped to
//! catalog codes here.

use serde::Deserialize;

use super::error::RawFailure;

/// Description fragments (lowercase) and the catalog code they identify.
/// Checked in order; the first match wins.
const DESCRIPTION_CODES: &[(&str, &str)] = &[
    ("bot was blocked by the user", "BOT_BLOCKED"),
    ("user is deactivated", "BOT_BLOCKED"),
    ("bot was kicked", "BOT_KICKED"),
    ("bot is not a member", "BOT_KICKED"),
    ("bot can't initiate conversation", "CANNOT_INITIATE_CONVERSATION"),
    ("can't initiate conversation", "CANNOT_INITIATE_CONVERSATION"),
    ("upgraded to a supergroup", "GROUP_CHAT_MIGRATED"),
    ("chat not found", "CHAT_NOT_FOUND"),
    ("user not found", "USER_NOT_FOUND"),
    ("replied message not found", "REPLY_MESSAGE_NOT_FOUND"),
    ("reply message not found", "REPLY_MESSAGE_NOT_FOUND"),
    ("message to edit not found", "MESSAGE_NOT_FOUND"),
    ("message to delete not found", "MESSAGE_NOT_FOUND"),
    ("message not found", "MESSAGE_NOT_FOUND"),
    ("message is too long", "MESSAGE_TOO_LONG"),
    ("message_too_long", "MESSAGE_TOO_LONG"),
    ("can't parse entities", "CANNOT_PARSE_ENTITIES"),
    ("button_data_invalid", "BUTTON_DATA_INVALID"),
    ("button_url_invalid", "BUTTON_URL_INVALID"),
    ("wrong file identifier", "INVALID_FILE_ID"),
    ("invalid file_id", "INVALID_FILE_ID"),
    ("peer_id_invalid", "PEER_ID_INVALID"),
    ("phone_number_invalid", "PHONE_NUMBER_INVALID"),
    ("photo_invalid_dimensions", "PHOTO_INVALID_DIMENSIONS"),
    ("stickerset_invalid", "STICKER_SET_INVALID"),
    ("message_id_invalid", "MESSAGE_ID_INVALID"),
    ("query is too old", "QUERY_TOO_OLD"),
    ("chat_admin_required", "CHAT_ADMIN_REQUIRED"),
    ("not enough rights", "CHAT_ADMIN_REQUIRED"),
    ("result_id_invalid", "INLINE_RESULT_EXPIRED"),
    ("terminated by other getupdates", "WEBHOOK_CONFLICT"),
    ("can't use getupdates method while webhook is active", "WEBHOOK_CONFLICT"),
    ("webhook is not set", "WEBHOOK_NOT_SET"),
    ("too many requests", "TOO_MANY_REQUESTS"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
    #[serde(default)]
    pub migrate_to_chat_id: Option<i64>,
}

/// Failure body returned by the Bot API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error_code: Option<u16>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

impl ApiErrorBody {
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    /// Convert to a [`RawFailure`]. `http_status` is used when the body does
    /// not carry an `error_code`.
    pub fn into_raw_failure(self, http_status: Option<u16>) -> RawFailure {
        let params = self.parameters.unwrap_or_default();
        let code = if params.migrate_to_chat_id.is_some() {
            Some("MIGRATE_TO_CHAT_ID".to_string())
        } else {
            code_from_description(&self.description).map(str::to_string)
        };
        RawFailure {
            status: self.error_code.or(http_status),
            code,
            message: self.description,
            retry_after: params.retry_after,
            migrate_to_chat_id: params.migrate_to_chat_id,
        }
    }
}

/// Catalog code for a well-known API description, if any.
pub fn code_from_description(description: &str) -> Option<&'static str> {
    let lower = description.to_ascii_lowercase();
    DESCRIPTION_CODES
        .iter()
        .find(|(fragment, _)| lower.contains(fragment))
        .map(|(_, code)| *code)
}

/// Build a [`RawFailure`] from an HTTP status and response body.
///
/// Bodies that are not valid API JSON are kept verbatim as the message.
pub fn raw_failure_from_response(http_status: u16, body: &str) -> RawFailure {
    match ApiErrorBody::from_json(body) {
        Ok(parsed) => parsed.into_raw_failure(Some(http_status)),
        Err(e) => {
            tracing::debug!("unparseable error body for HTTP {}: {}", http_status, e);
            RawFailure::http(http_status, body.trim())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::ErrorClassifier;

    #[test]
    fn blocked_body_maps_to_bot_blocked() {
        let raw = raw_failure_from_response(
            403,
            r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        );
        assert_eq!(raw.status, Some(403));
        assert_eq!(raw.code.as_deref(), Some("BOT_BLOCKED"));
        assert_eq!(raw.message, "Forbidden: bot was blocked by the user");
    }

    #[test]
    fn flood_body_keeps_retry_after() {
        let raw = raw_failure_from_response(
            429,
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 35","parameters":{"retry_after":35}}"#,
        );
        assert_eq!(raw.retry_after, Some(35));
        assert_eq!(raw.code.as_deref(), Some("TOO_MANY_REQUESTS"));
        let classified = ErrorClassifier::default().classify_failure(&raw);
        assert_eq!(classified.retry_after_secs, Some(35));
    }

    #[test]
    fn migrate_parameter_forces_migration_code() {
        let raw = raw_failure_from_response(
            400,
            r#"{"ok":false,"error_code":400,"description":"Bad Request: group chat was upgraded to a supergroup chat","parameters":{"migrate_to_chat_id":-1001234567890}}"#,
        );
        assert_eq!(raw.code.as_deref(), Some("MIGRATE_TO_CHAT_ID"));
        assert_eq!(raw.migrate_to_chat_id, Some(-1001234567890));
    }

    #[test]
    fn unknown_description_falls_back_to_status() {
        let raw = raw_failure_from_response(
            400,
            r#"{"ok":false,"error_code":400,"description":"Bad Request: something new"}"#,
        );
        assert!(raw.code.is_none());
        let classified = ErrorClassifier::default().classify_failure(&raw);
        assert_eq!(classified.code(), "BAD_REQUEST");
    }

    #[test]
    fn non_json_body_is_kept_as_message() {
        let raw = raw_failure_from_response(502, "<html>Bad Gateway</html>\n");
        assert_eq!(raw.status, Some(502));
        assert_eq!(raw.message, "<html>Bad Gateway</html>");
        assert!(raw.code.is_none());
    }

    #[test]
    fn description_codes_exist_in_builtin_catalog() {
        let catalog = crate::catalog::ErrorCatalog::builtin();
        for (_, code) in DESCRIPTION_CODES {
            assert!(
                catalog.contains(&crate::catalog::ErrorKey::named(*code)),
                "{code} missing from catalog"
            );
        }
    }
}
