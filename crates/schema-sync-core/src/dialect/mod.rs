//! Database dialect implementations.
//!
//! A dialect captures everything that varies between database engines:
//! which types are interchangeable, how default values are spelled, how
//! column names are cased, which keys may be dropped and the literal text of
//! every DDL statement. The diff engine only talks to [`Dialect`].

mod defaults;
mod mysql;
mod sqlite;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use defaults::{quote_literal, unquote, DefaultEquivalence};
pub use mysql::MySqlDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Result, SchemaError};
use crate::schema::{Column, ForeignKey, Key, SqlType, Table};

/// Keywords that are written as-is in a DEFAULT clause.
const DEFAULT_KEYWORDS: &[&str] = &[
    "CURRENT_TIMESTAMP",
    "CURRENT_DATE",
    "CURRENT_TIME",
    "NULL",
];

/// Trait for database-specific comparison rules and DDL generation.
///
/// Generators return the statements to run in order. An empty list means the
/// engine cannot express the change; the diff engine then skips it.
pub trait Dialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the rules used to compare default values.
    fn default_equivalence(&self) -> &DefaultEquivalence;

    /// Maps a native type as reported by the catalog to a portable type.
    ///
    /// Returns `None` when the engine type has no portable counterpart.
    fn native_type(&self, native: &str) -> Option<SqlType>;

    /// Returns the native column type for `column`, e.g. `VARCHAR(255)`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnsupportedType`] when the portable type has no
    /// mapping in this engine.
    fn type_name(&self, column: &Column) -> Result<String>;

    /// Post-processes an introspected table so it compares cleanly against
    /// a declared one.
    fn complete_table_infos(&self, table: Table) -> Table {
        table
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quotes and joins a list of identifiers.
    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether two portable types are interchangeable in this engine.
    fn are_types_equal(&self, a: SqlType, b: SqlType) -> bool {
        a == b
    }

    /// Compares a declared column with its live counterpart.
    ///
    /// Returns `None` when both are equivalent, otherwise a short description
    /// of the first difference found.
    fn are_columns_equal(&self, target: &Column, current: &Column) -> Option<String> {
        if !self.are_types_equal(target.sql_type, current.sql_type) {
            return Some(format!(
                "the types differ (target: {}, current: {})",
                target.sql_type, current.sql_type
            ));
        }

        // Lengths only matter for character columns. A zero target length
        // means "engine default".
        if self.are_types_equal(SqlType::Char, target.sql_type)
            && target.length != 0
            && target.length != current.length
        {
            return Some(format!(
                "the lengths differ (target: {}, current: {})",
                target.length, current.length
            ));
        }

        if self.are_types_equal(SqlType::Decimal, target.sql_type) {
            if target.precision != current.precision {
                return Some(format!(
                    "the precisions differ (target: {}, current: {})",
                    target.precision, current.precision
                ));
            }
            if target.scale != current.scale {
                return Some(format!(
                    "the scales differ (target: {}, current: {})",
                    target.scale, current.scale
                ));
            }
        }

        // TIMESTAMP columns without default are forced NOT NULL with an
        // automatic value by some engines.
        let managed_timestamp =
            target.sql_type == SqlType::Timestamp && target.default_value.is_none();

        if target.nullable != current.nullable && !managed_timestamp {
            return Some(format!(
                "the nullability differs (target: {}, current: {})",
                null_label(target.nullable),
                null_label(current.nullable)
            ));
        }

        if !managed_timestamp
            && !target.auto_increment
            && !self.default_equivalence().are_equal(
                target.default_value.as_deref(),
                current.default_value.as_deref(),
            )
        {
            return Some(format!(
                "the default values differ (target: {}, current: {})",
                target.default_value.as_deref().unwrap_or("NULL"),
                current.default_value.as_deref().unwrap_or("NULL")
            ));
        }

        None
    }

    /// Whether column names must match exactly.
    fn is_column_case_sensitive(&self) -> bool {
        true
    }

    /// Translates a declared column name into the form the engine reports.
    fn translate_column_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// Whether two table names denote the same table.
    fn table_names_equal(&self, a: &str, b: &str) -> bool {
        a.eq_ignore_ascii_case(b)
    }

    /// Returns the name under which `key` exists in the database.
    fn effective_key_name(&self, _table: &Table, key: &Key) -> String {
        key.name.clone()
    }

    /// Whether an undeclared key of `current` may be dropped.
    fn should_drop_key(&self, _target: &Table, _current: &Table, _key: &Key) -> bool {
        true
    }

    /// Whether a default value has to be written as a quoted literal.
    fn needs_quotation(&self, column: &Column) -> bool {
        matches!(
            column.sql_type,
            SqlType::Char
                | SqlType::Varchar
                | SqlType::LongVarchar
                | SqlType::Clob
                | SqlType::Date
                | SqlType::Time
                | SqlType::Timestamp
        )
    }

    /// Returns the `DEFAULT ...` clause of a column, if it has a default.
    fn default_clause(&self, column: &Column) -> Option<String> {
        let value = column.default_value.as_deref()?;
        let keyword = DEFAULT_KEYWORDS
            .iter()
            .any(|k| k.eq_ignore_ascii_case(value));
        if self.needs_quotation(column) && !keyword {
            Some(format!("DEFAULT {}", quote_literal(value)))
        } else {
            Some(format!("DEFAULT {value}"))
        }
    }

    /// Generates the statements creating `table`.
    ///
    /// # Errors
    ///
    /// Fails when a column type is not supported.
    fn create_table(&self, table: &Table) -> Result<Vec<String>>;

    /// Whether [`Dialect::create_table`] already declares the foreign keys
    /// of a new table.
    fn creates_foreign_keys_inline(&self) -> bool {
        false
    }

    /// Generates the statements dropping `table`.
    fn drop_table(&self, table: &Table) -> Vec<String> {
        vec![format!("DROP TABLE {}", self.quote_identifier(&table.name))]
    }

    /// Generates the statements renaming `old_name` to `table.name`.
    fn rename_table(&self, old_name: &str, table: &Table) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(&table.name)
        )]
    }

    /// Generates the statements adding `column` to `table`.
    ///
    /// # Errors
    ///
    /// Fails when the column type is not supported.
    fn add_column(&self, table: &Table, column: &Column) -> Result<Vec<String>>;

    /// Generates the statements dropping `column` from `table`.
    fn drop_column(&self, table: &Table, column: &Column) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(&table.name),
            self.quote_identifier(&column.name)
        )]
    }

    /// Generates the statements turning the live column `old_name` (or the
    /// column of the same name) into `column`.
    ///
    /// # Errors
    ///
    /// Fails when the column type is not supported.
    fn alter_column_to(
        &self,
        table: &Table,
        old_name: Option<&str>,
        column: &Column,
    ) -> Result<Vec<String>>;

    /// Generates the statements replacing the primary key of `current` with
    /// the one declared by `target`.
    fn alter_primary_key(&self, target: &Table, current: &Table) -> Vec<String>;

    /// Generates the statements adding `key`.
    fn add_key(&self, table: &Table, key: &Key) -> Vec<String>;

    /// Generates the statements dropping `key`.
    fn drop_key(&self, table: &Table, key: &Key) -> Vec<String>;

    /// Generates the statements turning `from` into `to`.
    fn alter_key(&self, table: &Table, from: &Key, to: &Key) -> Vec<String> {
        let mut statements = self.drop_key(table, from);
        statements.extend(self.add_key(table, to));
        statements
    }

    /// Generates the statements adding `foreign_key`.
    fn add_foreign_key(&self, table: &Table, foreign_key: &ForeignKey) -> Vec<String>;

    /// Generates the statements dropping `foreign_key`.
    fn drop_foreign_key(&self, table: &Table, foreign_key: &ForeignKey) -> Vec<String>;

    /// Generates the statements turning `from` into `to`.
    fn alter_foreign_key(&self, table: &Table, from: &ForeignKey, to: &ForeignKey) -> Vec<String> {
        let mut statements = self.drop_foreign_key(table, from);
        statements.extend(self.add_foreign_key(table, to));
        statements
    }
}

fn null_label(nullable: bool) -> &'static str {
    if nullable {
        "NULL"
    } else {
        "NOT NULL"
    }
}

/// Builds the unsupported-type error for `column`.
pub(crate) fn unsupported(column: &Column) -> SchemaError {
    SchemaError::UnsupportedType {
        type_name: column.sql_type.name().to_string(),
        column: column.name.clone(),
    }
}

/// Splits a native type such as `DECIMAL(10,2)` into its base name and
/// numeric arguments.
#[must_use]
pub fn split_type_args(native: &str) -> (&str, Vec<u32>) {
    let native = native.trim();
    let Some((base, rest)) = native.split_once('(') else {
        return (native, Vec::new());
    };
    let args = rest
        .split_once(')')
        .map_or(rest, |(inner, _)| inner)
        .split(',')
        .filter_map(|a| a.trim().parse().ok())
        .collect();
    (base.trim(), args)
}

/// Database engines with a dialect implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// MySQL / MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Engine {
    /// Creates the default dialect for this engine.
    #[must_use]
    pub fn dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::MySql => Box::new(MySqlDialect::new()),
            Self::Sqlite => Box::new(SqliteDialect::new()),
        }
    }

    /// Derives the engine from a connection URL scheme.
    #[must_use]
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once(':').map_or(url, |(s, _)| s);
        match scheme.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MySql => f.write_str("mysql"),
            Self::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown engine '{other}' (expected mysql or sqlite)")),
        }
    }
}
