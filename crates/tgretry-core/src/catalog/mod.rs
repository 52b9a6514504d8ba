//! Error catalog.
//!
//! Immutable mapping from an [`ErrorKey`] (numeric status or textual code) to
//! an [`ErrorDescriptor`]. The built-in table is embedded in the binary and
//! parsed once on first use; other tables can be loaded from JSON or TOML
//! without code changes. Nothing mutates a catalog after construction, so it
//! is shared freely across concurrent retry sequences.

mod classes;
mod descriptor;
mod error;
mod key;
mod load;

use std::collections::HashMap;
use std::path::Path;

pub use classes::{authored_retry_class, is_migration, MIGRATION_CODES};
pub use descriptor::{ErrorDescriptor, RetryClass};
pub use error::CatalogError;
pub use key::{EmptyKey, ErrorKey};

#[derive(Debug, Clone)]
pub struct ErrorCatalog {
    entries: HashMap<ErrorKey, ErrorDescriptor>,
    unknown: ErrorDescriptor,
}

impl ErrorCatalog {
    /// The embedded table, frozen for the life of the process.
    pub fn builtin() -> &'static ErrorCatalog {
        load::builtin()
    }

    pub fn from_json_str(data: &str) -> Result<Self, CatalogError> {
        load::from_json_str(data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, CatalogError> {
        load::from_toml_str(data)
    }

    /// Load a table from disk; the format follows the file extension.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        load::load_from_path(path.as_ref())
    }

    /// Exact-match lookup. `None` is the normal "not found" outcome.
    pub fn lookup(&self, key: &ErrorKey) -> Option<&ErrorDescriptor> {
        self.entries.get(key)
    }

    /// The fallback descriptor. Also reachable through `lookup`: loaders
    /// insert it when the data does not define one.
    pub fn unknown(&self) -> &ErrorDescriptor {
        &self.unknown
    }

    pub fn contains(&self, key: &ErrorKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ErrorKey, &ErrorDescriptor)> {
        self.entries.iter()
    }
}
