use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Key used to index catalog entries.
///
/// Upstream reports either a numeric HTTP-like status or a textual code. The
/// two spaces never overlap: `"429"` always parses as `Numeric(429)`, so a
/// lookup is a single exact match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKey {
    Numeric(u16),
    Named(String),
}

impl ErrorKey {
    /// Key of the fallback descriptor used when nothing else matches.
    pub const UNKNOWN: &'static str = "UNKNOWN";

    pub fn named(code: impl Into<String>) -> Self {
        ErrorKey::Named(code.into())
    }

    pub fn unknown() -> Self {
        ErrorKey::Named(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ErrorKey::Named(s) if s == Self::UNKNOWN)
    }

    /// String form for persistence: the number in decimal, or the code as-is.
    pub fn to_string_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKey::Numeric(n) => write!(f, "{}", n),
            ErrorKey::Named(s) => write!(f, "{}", s),
        }
    }
}

impl From<u16> for ErrorKey {
    fn from(n: u16) -> Self {
        ErrorKey::Numeric(n)
    }
}

impl From<&str> for ErrorKey {
    fn from(s: &str) -> Self {
        ErrorKey::Named(s.to_string())
    }
}

/// Error returned when a key string is empty or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("error key must not be empty")]
pub struct EmptyKey;

impl FromStr for ErrorKey {
    type Err = EmptyKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmptyKey);
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = s.parse::<u16>() {
                return Ok(ErrorKey::Numeric(n));
            }
        }
        Ok(ErrorKey::Named(s.to_string()))
    }
}

impl Serialize for ErrorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ErrorKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_parse_as_numeric() {
        assert_eq!("429".parse::<ErrorKey>().unwrap(), ErrorKey::Numeric(429));
        assert_eq!(" 503 ".parse::<ErrorKey>().unwrap(), ErrorKey::Numeric(503));
    }

    #[test]
    fn text_parses_as_named() {
        assert_eq!(
            "BOT_BLOCKED".parse::<ErrorKey>().unwrap(),
            ErrorKey::named("BOT_BLOCKED")
        );
        // Out of u16 range stays textual rather than wrapping.
        assert_eq!(
            "99999999".parse::<ErrorKey>().unwrap(),
            ErrorKey::named("99999999")
        );
    }

    #[test]
    fn empty_key_rejected() {
        assert_eq!("  ".parse::<ErrorKey>(), Err(EmptyKey));
    }

    #[test]
    fn numeric_and_named_never_collide() {
        assert_ne!(ErrorKey::Numeric(400), ErrorKey::named("400x"));
        assert_eq!(ErrorKey::Numeric(400).to_string_key(), "400");
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&ErrorKey::Numeric(404)).unwrap();
        assert_eq!(json, "\"404\"");
        let key: ErrorKey = serde_json::from_str("\"CHAT_NOT_FOUND\"").unwrap();
        assert_eq!(key, ErrorKey::named("CHAT_NOT_FOUND"));
    }
}
