//! Error types for introspection and execution.

use std::path::PathBuf;

use schema_sync_core::error::SchemaError;

/// Errors that can occur while reading, planning or applying schema changes.
///
/// Failing DDL statements are not errors; they are recorded on the action
/// that ran them.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Database error while connecting or reading the catalog.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The schema cannot be compared or expressed by the dialect.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// IO error (reading the target schema file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the target schema file.
    #[error("Failed to parse target schema '{path}': {source}")]
    InvalidTargetSchema {
        /// Path to the schema file.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The connection URL names no supported engine.
    #[error("Unsupported database URL '{0}' (expected mysql:// or sqlite:)")]
    UnsupportedUrl(String),

    /// No action with the given id exists in the plan.
    #[error("Action not found: {0}")]
    ActionNotFound(String),
}

/// Result type for schema sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
