use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures reading the input table. Bad individual cells never end up here.
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("sheet {sheet:?} not found in {}", .path.display())]
    SheetNotFound { sheet: String, path: PathBuf },

    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is {size} bytes, above the {limit} byte limit", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("malformed table: {0}")]
    Malformed(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("history record {0} not found")]
    NotFound(String),

    #[error("history I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history record {name} is not valid: {source}")]
    Format {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}
