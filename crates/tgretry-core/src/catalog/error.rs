//! Errors raised while loading a catalog from serialized data.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid catalog TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog entry {key:?} has an empty key or code")]
    EmptyCode { key: String },

    #[error("unsupported catalog format for {path} (expected .json or .toml)")]
    UnsupportedFormat { path: PathBuf },
}
