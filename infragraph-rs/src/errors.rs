//! Error types for infragraph-rs.

use std::time::Duration;

/// Alias for Results returning [`IngestError`].
pub type Result<T> = std::result::Result<T, IngestError>;

/// Top-level error type for infragraph-rs.
///
/// Every variant here aborts a run. Per-record validation failures and per-batch
/// write failures are not errors at this level; they surface in the run summary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required input column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Table error: {0}")]
    Table(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("IO error on '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid write plan: {0}")]
    Plan(String),
}

impl IngestError {
    /// Create an IO error with a path context.
    pub(crate) fn io(path: impl std::fmt::Display, source: std::io::Error) -> Self {
        IngestError::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Graph-store errors raised while executing a single statement batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// Connection loss or a store-side transient condition; safe to retry.
    #[error("Transient store failure: {0}")]
    Transient(String),

    /// The store refused the statement (syntax, constraint violation, auth).
    #[error("Store rejected statement: {0}")]
    Rejected(String),

    #[error("Batch timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    /// Whether the batch may be attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}
