//! Schema introspection.
//!
//! Reads the structure of a live database from its catalog into the schema
//! model. Every table is passed through the dialect's
//! [`Dialect::complete_table_infos`](schema_sync_core::dialect::Dialect::complete_table_infos)
//! hook before it is returned, so it compares cleanly against declared
//! tables.
//!
//! A column type without portable counterpart only affects its own table:
//! the table is reported as unreadable and the remaining tables are read.

mod mysql;
mod sqlite;

use std::future::Future;

pub use mysql::MySqlIntrospector;
pub use sqlite::SqliteIntrospector;

use tracing::warn;

use schema_sync_core::dialect::Dialect;
use schema_sync_core::error::SchemaError;
use schema_sync_core::schema::{ForeignKey, Key, Table};

use crate::error::{Result, SyncError};

/// Introspects a live database connection.
pub trait Introspect {
    /// Reads all base tables of the connected database, ordered by name.
    fn schema(&self) -> impl Future<Output = Result<LiveSchema>> + Send;
}

/// The schema of a live database.
#[derive(Debug, Default)]
pub struct LiveSchema {
    /// Tables read successfully.
    pub tables: Vec<Table>,
    /// Tables that could not be read, with the reason.
    pub unreadable: Vec<(String, SchemaError)>,
}

impl LiveSchema {
    /// Adds the outcome of reading table `name`.
    ///
    /// Unsupported column types mark the table unreadable; other errors
    /// are returned.
    fn push(&mut self, name: String, table: Result<Table>) -> Result<()> {
        match table {
            Ok(table) => self.tables.push(table),
            Err(SyncError::Schema(e)) => {
                warn!(table = %name, error = %e, "Skipping unreadable table");
                self.unreadable.push((name, e));
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// Returns the readable tables for reconciling with `targets`.
    ///
    /// # Errors
    ///
    /// Fails with the table's error when an unreadable table is declared
    /// by a target, either by name or as its `old_name`.
    pub fn into_tables(self, targets: &[Table], dialect: &dyn Dialect) -> Result<Vec<Table>> {
        let declared = |name: &str| {
            targets.iter().any(|t| {
                dialect.table_names_equal(&t.name, name)
                    || t.old_name
                        .as_deref()
                        .is_some_and(|old| dialect.table_names_equal(old, name))
            })
        };
        if let Some((_, e)) = self
            .unreadable
            .into_iter()
            .find(|(name, _)| declared(name))
        {
            return Err(e.into());
        }
        Ok(self.tables)
    }
}

/// Error for a native type without portable counterpart.
fn unsupported(native: &str, table: &str, column: &str) -> SchemaError {
    SchemaError::UnsupportedType {
        type_name: native.to_string(),
        column: format!("{table}.{column}"),
    }
}

/// Appends `column` to the key named `name`, creating it on first sight.
fn push_key_column(keys: &mut Vec<Key>, name: &str, column: String, unique: bool) {
    if let Some(key) = keys.iter_mut().find(|k| k.name == name) {
        key.columns.push(column);
    } else {
        let mut key = Key::new(name).column(column);
        key.unique = unique;
        keys.push(key);
    }
}

/// Appends a column pair to the foreign key named `name`, creating it on
/// first sight.
fn push_foreign_key_column(
    foreign_keys: &mut Vec<ForeignKey>,
    name: &str,
    foreign_table: &str,
    column: String,
    foreign_column: String,
) {
    if let Some(fk) = foreign_keys.iter_mut().find(|fk| fk.name == name) {
        fk.columns.push(column);
        fk.foreign_columns.push(foreign_column);
    } else {
        foreign_keys.push(ForeignKey::new(name, foreign_table).column(column, foreign_column));
    }
}

/// Clamps a catalog size to the model's range.
fn to_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_sync_core::dialect::SqliteDialect;
    use schema_sync_core::schema::{Column, SqlType};

    fn live_schema() -> LiveSchema {
        let mut schema = LiveSchema::default();
        schema
            .push(
                "customers".to_string(),
                Ok(Table::new("customers").column(Column::new("id", SqlType::BigInt))),
            )
            .unwrap();
        schema
            .push(
                "events".to_string(),
                Err(unsupported("vector(3)", "events", "embedding").into()),
            )
            .unwrap();
        schema
    }

    #[test]
    fn test_unreadable_table_is_isolated() {
        let schema = live_schema();
        assert_eq!(schema.tables.len(), 1);
        assert_eq!(schema.unreadable.len(), 1);
        assert_eq!(schema.unreadable[0].0, "events");

        let targets = vec![Table::new("customers")];
        let tables = schema.into_tables(&targets, &SqliteDialect::new()).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "customers");
    }

    #[test]
    fn test_unreadable_target_table_fails() {
        let dialect = SqliteDialect::new();
        let targets = vec![Table::new("EVENTS")];
        assert!(matches!(
            live_schema().into_tables(&targets, &dialect),
            Err(SyncError::Schema(SchemaError::UnsupportedType { .. }))
        ));

        let renamed = vec![Table::new("audit").old_name("events")];
        assert!(live_schema().into_tables(&renamed, &dialect).is_err());
    }

    #[test]
    fn test_other_errors_propagate() {
        let mut schema = LiveSchema::default();
        let result = schema.push(
            "t".to_string(),
            Err(SyncError::UnsupportedUrl("x".to_string())),
        );
        assert!(matches!(result, Err(SyncError::UnsupportedUrl(_))));
        assert!(schema.unreadable.is_empty());
    }

    #[test]
    fn test_push_key_column_groups_by_name() {
        let mut keys = Vec::new();
        push_key_column(&mut keys, "idx_a", "x".to_string(), false);
        push_key_column(&mut keys, "uq_b", "y".to_string(), true);
        push_key_column(&mut keys, "idx_a", "z".to_string(), false);
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].columns, vec!["x", "z"]);
        assert!(keys[1].unique);
    }

    #[test]
    fn test_push_foreign_key_column_pairs_positionally() {
        let mut fks = Vec::new();
        push_foreign_key_column(&mut fks, "fk", "t", "a".into(), "x".into());
        push_foreign_key_column(&mut fks, "fk", "t", "b".into(), "y".into());
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].columns, vec!["a", "b"]);
        assert_eq!(fks[0].foreign_columns, vec!["x", "y"]);
    }

    #[test]
    fn test_to_u32() {
        assert_eq!(to_u32(-1), 0);
        assert_eq!(to_u32(255), 255);
        assert_eq!(to_u32(4_294_967_296), u32::MAX);
    }
}
