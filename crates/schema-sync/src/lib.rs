//! Live schema reconciliation for MySQL and SQLite.
//!
//! `schema-sync` reads the schema of a running database, compares it with a
//! declared target using [`schema_sync_core`], and executes the resulting
//! update actions. Actions that may lose data only run when explicitly
//! allowed, and each action records whether it ran and why it failed.
//!
//! # Example
//!
//! ```rust,ignore
//! use schema_sync::prelude::*;
//!
//! let mut config = SyncConfig::new("sqlite:shop.db");
//! config.policy = ExecutionPolicy::SafeOnly;
//!
//! let sync = SchemaSync::connect(config).await?;
//! let targets = load_target_schema("schema.json".as_ref())?;
//! let (actions, summary) = sync.apply(&targets, CancellationToken::new()).await?;
//!
//! for action in actions.iter().filter(|a| a.is_failed()) {
//!     eprintln!("{action}");
//! }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show what would change
//! schema-sync -d sqlite:shop.db plan --target schema.json
//!
//! # Apply safe changes only
//! schema-sync -d sqlite:shop.db apply --target schema.json
//!
//! # Apply everything, including drops
//! schema-sync -d mysql://root@localhost/shop apply --target schema.json --allow-data-loss
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod sync;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{load_target_schema, parse_target_schema, ExecutionPolicy, SyncConfig};
    pub use crate::database::Database;
    pub use crate::error::{Result, SyncError};
    pub use crate::executor::{ExecutionSummary, Executor};
    pub use crate::introspect::{Introspect, LiveSchema};
    pub use crate::sync::SchemaSync;
    pub use tokio_util::sync::CancellationToken;
    pub use schema_sync_core::prelude::{
        ActionKind, Column, Dialect, Engine, ForeignKey, Key, SqlType, Table, UpdateAction,
    };
}
