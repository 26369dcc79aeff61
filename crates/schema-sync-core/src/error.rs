//! Error types for schema comparison and DDL generation.

/// Errors that can occur while planning schema changes.
///
/// Structural differences are never errors; they become update actions.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A column uses a type the dialect has no native mapping for.
    #[error("Unsupported type {type_name} for column '{column}'")]
    UnsupportedType {
        /// Portable or native name of the offending type.
        type_name: String,
        /// Column that carries the type.
        column: String,
    },

    /// An integer type code outside the known portable codes.
    #[error("Unknown type code: {0}")]
    UnknownTypeCode(i32),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
