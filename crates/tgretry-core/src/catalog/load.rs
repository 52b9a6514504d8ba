//! Building a catalog from serialized data (embedded JSON, JSON or TOML files).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;

use super::classes::retry_class_or_default;
use super::error::CatalogError;
use super::{ErrorCatalog, ErrorDescriptor, ErrorKey, RetryClass};

/// Process-wide catalog parsed once from the embedded table.
static BUILTIN: LazyLock<ErrorCatalog> = LazyLock::new(|| {
    let json = include_str!("../../data/catalog.json");
    ErrorCatalog::from_json_str(json).expect("embedded data/catalog.json must parse")
});

pub(super) fn builtin() -> &'static ErrorCatalog {
    &BUILTIN
}

/// One serialized entry. `retry_class` is optional so descriptive tables can
/// omit it and rely on the authored class table.
#[derive(Debug, Deserialize)]
struct RawEntry {
    code: String,
    description: String,
    #[serde(default)]
    common_causes: Vec<String>,
    #[serde(default)]
    examples: Vec<String>,
    #[serde(alias = "solution")]
    remediation: String,
    #[serde(default)]
    retry_class: Option<RetryClass>,
}

pub(super) fn from_json_str(data: &str) -> Result<ErrorCatalog, CatalogError> {
    let raw: BTreeMap<String, RawEntry> = serde_json::from_str(data)?;
    build(raw)
}

pub(super) fn from_toml_str(data: &str) -> Result<ErrorCatalog, CatalogError> {
    let raw: BTreeMap<String, RawEntry> = toml::from_str(data)?;
    build(raw)
}

pub(super) fn load_from_path(path: &Path) -> Result<ErrorCatalog, CatalogError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let parse: fn(&str) -> Result<ErrorCatalog, CatalogError> = match ext.as_deref() {
        Some("json") => from_json_str,
        Some("toml") => from_toml_str,
        _ => {
            return Err(CatalogError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };
    let data = fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = parse(&data)?;
    tracing::debug!(
        "loaded {} catalog entries from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

fn build(raw: BTreeMap<String, RawEntry>) -> Result<ErrorCatalog, CatalogError> {
    let mut entries = HashMap::with_capacity(raw.len() + 1);
    for (raw_key, entry) in raw {
        let key: ErrorKey = raw_key
            .parse()
            .map_err(|_| CatalogError::EmptyCode {
                key: raw_key.clone(),
            })?;
        if entry.code.trim().is_empty() {
            return Err(CatalogError::EmptyCode { key: raw_key });
        }
        let retry_class = entry
            .retry_class
            .unwrap_or_else(|| retry_class_or_default(&key));
        entries.insert(
            key,
            ErrorDescriptor {
                code: entry.code,
                description: entry.description,
                common_causes: entry.common_causes,
                examples: entry.examples,
                remediation: entry.remediation,
                retry_class,
            },
        );
    }
    let unknown = entries
        .entry(ErrorKey::unknown())
        .or_insert_with(ErrorDescriptor::unknown)
        .clone();
    Ok(ErrorCatalog { entries, unknown })
}
