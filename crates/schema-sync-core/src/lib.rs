//! Schema reconciliation for relational databases.
//!
//! `schema-sync-core` compares a declared target schema with the schema of
//! a live database and plans the structural changes needed to reconcile
//! them. It performs no I/O: reading the live schema and executing the plan
//! is left to the `schema-sync` crate.
//!
//! # Architecture
//!
//! - **Schema** - `Table`, `Column`, `Key` and `ForeignKey`, shared by the
//!   declared and the introspected side
//! - **Dialect** - engine specific comparison rules and DDL generation
//!   (`MySqlDialect`, `SqliteDialect`)
//! - **Diff** - produces the ordered list of update actions
//! - **Action** - a classified, executable unit of change
//!
//! # Example
//!
//! ```rust
//! use schema_sync_core::prelude::*;
//!
//! let target = vec![Table::new("orders")
//!     .column(Column::new("id", SqlType::BigInt).auto_increment())
//!     .column(Column::new("status", SqlType::Varchar).length(20).not_null())
//!     .primary_key(["id"])];
//!
//! let dialect = MySqlDialect::new();
//! let actions = reconcile(&dialect, &target, &[], false).unwrap();
//!
//! assert_eq!(actions.len(), 1);
//! assert_eq!(actions[0].reason, "table orders does not exist");
//! assert!(!actions[0].data_loss_possible);
//! ```

pub mod action;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::action::{ActionKind, UpdateAction};
    pub use crate::dialect::{DefaultEquivalence, Dialect, Engine, MySqlDialect, SqliteDialect};
    pub use crate::diff::{reconcile, DiffOptions, SchemaDiff};
    pub use crate::error::{Result, SchemaError};
    pub use crate::schema::{Column, ForeignKey, Key, SqlType, Table};
}
