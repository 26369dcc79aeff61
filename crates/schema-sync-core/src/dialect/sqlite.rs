//! SQLite dialect.
//!
//! SQLite has limited ALTER TABLE support: columns can be added, renamed
//! and dropped, but neither column types, primary keys nor foreign keys can
//! be changed after creation. Foreign keys are therefore declared inline by
//! `CREATE TABLE` and changes SQLite cannot express yield no statements.
//!
//! Type names are free-form in SQLite, so the declared name is what gets
//! reported back. Comparison is lenient and groups types by affinity.

use crate::error::Result;
use crate::schema::{Column, ForeignKey, Key, SqlType, Table};

use super::{split_type_args, DefaultEquivalence, Dialect};

/// Prefix of the indexes SQLite creates for PRIMARY KEY and UNIQUE
/// constraints.
const AUTOINDEX_PREFIX: &str = "sqlite_autoindex_";

const TYPE_FAMILIES: &[&[SqlType]] = &[
    &[
        SqlType::Bit,
        SqlType::Boolean,
        SqlType::TinyInt,
        SqlType::SmallInt,
        SqlType::Integer,
        SqlType::BigInt,
    ],
    &[SqlType::Char, SqlType::Varchar],
    &[SqlType::LongVarchar, SqlType::Clob],
    &[
        SqlType::Binary,
        SqlType::VarBinary,
        SqlType::LongVarBinary,
        SqlType::Blob,
    ],
    &[SqlType::Numeric, SqlType::Decimal],
    &[SqlType::Float, SqlType::Real, SqlType::Double],
];

/// SQLite dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect {
    equivalence: DefaultEquivalence,
}

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self {
            equivalence: DefaultEquivalence::standard(),
        }
    }

    /// Replaces the default value equivalence rules.
    #[must_use]
    pub fn with_default_equivalence(mut self, equivalence: DefaultEquivalence) -> Self {
        self.equivalence = equivalence;
        self
    }

    /// Whether the column is declared as an `AUTOINCREMENT` primary key.
    fn inline_primary_key(table: &Table, column: &Column) -> bool {
        column.auto_increment
            && table.primary_key.len() == 1
            && table.is_primary_key_column(&column.name)
    }

    fn column_definition(&self, column: &Column, inline_primary_key: bool) -> Result<String> {
        if inline_primary_key {
            // AUTOINCREMENT is only allowed on an INTEGER PRIMARY KEY.
            return Ok(format!(
                "{} INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT",
                self.quote_identifier(&column.name)
            ));
        }
        let mut parts = vec![self.quote_identifier(&column.name), self.type_name(column)?];
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = self.default_clause(column) {
            parts.push(default);
        }
        Ok(parts.join(" "))
    }

    fn index_statement(&self, table: &Table, key: &Key) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if key.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&key.name),
            self.quote_identifier(&table.name),
            self.quote_list(&key.columns)
        )
    }
}

fn with_length(name: &str, length: u32) -> String {
    if length == 0 {
        name.to_string()
    } else {
        format!("{name}({length})")
    }
}

fn with_precision(name: &str, column: &Column) -> String {
    if column.precision == 0 {
        name.to_string()
    } else {
        format!("{name}({},{})", column.precision, column.scale)
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn default_equivalence(&self) -> &DefaultEquivalence {
        &self.equivalence
    }

    fn native_type(&self, native: &str) -> Option<SqlType> {
        let (base, _) = split_type_args(native);
        let base = base.to_ascii_uppercase();
        let sql_type = match base.as_str() {
            "BIT" => SqlType::Bit,
            "BOOL" | "BOOLEAN" => SqlType::Boolean,
            "TINYINT" => SqlType::TinyInt,
            "SMALLINT" => SqlType::SmallInt,
            "INT" | "INTEGER" | "MEDIUMINT" => SqlType::Integer,
            "BIGINT" => SqlType::BigInt,
            "FLOAT" => SqlType::Float,
            "REAL" => SqlType::Real,
            "DOUBLE" | "DOUBLE PRECISION" => SqlType::Double,
            "NUMERIC" => SqlType::Numeric,
            "DECIMAL" => SqlType::Decimal,
            "CHAR" | "CHARACTER" | "NCHAR" => SqlType::Char,
            "VARCHAR" | "NVARCHAR" | "VARYING CHARACTER" => SqlType::Varchar,
            "TEXT" | "LONGVARCHAR" => SqlType::LongVarchar,
            "CLOB" => SqlType::Clob,
            "DATE" => SqlType::Date,
            "TIME" => SqlType::Time,
            "TIMESTAMP" | "DATETIME" => SqlType::Timestamp,
            "BINARY" => SqlType::Binary,
            "VARBINARY" => SqlType::VarBinary,
            "LONGVARBINARY" => SqlType::LongVarBinary,
            "BLOB" | "" => SqlType::Blob,
            // Anything else is classified by SQLite's affinity rules.
            other if other.contains("INT") => SqlType::Integer,
            other if ["CHAR", "CLOB", "TEXT"].iter().any(|t| other.contains(t)) => {
                SqlType::LongVarchar
            }
            other if other.contains("BLOB") => SqlType::Blob,
            other if ["REAL", "FLOA", "DOUB"].iter().any(|t| other.contains(t)) => {
                SqlType::Double
            }
            _ => SqlType::Numeric,
        };
        Some(sql_type)
    }

    fn type_name(&self, column: &Column) -> Result<String> {
        let name = match column.sql_type {
            SqlType::Char => with_length("CHAR", column.length),
            SqlType::Varchar => with_length("VARCHAR", column.length),
            SqlType::Binary => with_length("BINARY", column.length),
            SqlType::VarBinary => with_length("VARBINARY", column.length),
            SqlType::Decimal => with_precision("DECIMAL", column),
            SqlType::Numeric => with_precision("NUMERIC", column),
            SqlType::LongVarchar => "TEXT".to_string(),
            SqlType::LongVarBinary => "BLOB".to_string(),
            other => other.name().to_string(),
        };
        Ok(name)
    }

    fn complete_table_infos(&self, mut table: Table) -> Table {
        // The primary key shows up as an automatic index.
        let primary_key = table.primary_key.clone();
        table.keys.retain(|k| {
            !(k.name.starts_with(AUTOINDEX_PREFIX)
                && crate::schema::names_equal(&k.columns, &primary_key))
        });
        table
    }

    fn are_types_equal(&self, a: SqlType, b: SqlType) -> bool {
        a == b
            || TYPE_FAMILIES
                .iter()
                .any(|family| family.contains(&a) && family.contains(&b))
    }

    fn is_column_case_sensitive(&self) -> bool {
        false
    }

    /// Index names are global in SQLite, so keys are scoped by table name.
    fn effective_key_name(&self, table: &Table, key: &Key) -> String {
        let prefix = format!("{}_", table.name);
        let scoped = key
            .name
            .get(..prefix.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(&prefix));
        if scoped {
            key.name.clone()
        } else {
            format!("{prefix}{}", key.name)
        }
    }

    fn should_drop_key(&self, _target: &Table, _current: &Table, key: &Key) -> bool {
        !key.name.starts_with(AUTOINDEX_PREFIX)
    }

    fn create_table(&self, table: &Table) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut inline_pk = false;
        for column in &table.columns {
            let inline = Self::inline_primary_key(table, column);
            inline_pk |= inline;
            lines.push(format!("  {}", self.column_definition(column, inline)?));
        }
        if !inline_pk && !table.primary_key.is_empty() {
            lines.push(format!(
                "  PRIMARY KEY ({})",
                self.quote_list(&table.primary_key)
            ));
        }
        for fk in &table.foreign_keys {
            lines.push(format!(
                "  CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                self.quote_identifier(&fk.name),
                self.quote_list(&fk.columns),
                self.quote_identifier(&fk.foreign_table),
                self.quote_list(&fk.foreign_columns)
            ));
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_identifier(&table.name),
            lines.join(",\n")
        )];
        statements.extend(table.keys.iter().map(|k| self.index_statement(table, k)));
        Ok(statements)
    }

    fn creates_foreign_keys_inline(&self) -> bool {
        true
    }

    fn add_column(&self, table: &Table, column: &Column) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(&table.name),
            self.column_definition(column, false)?
        )])
    }

    /// Only renames can be expressed; type, nullability and default changes
    /// yield no statements.
    fn alter_column_to(
        &self,
        table: &Table,
        old_name: Option<&str>,
        column: &Column,
    ) -> Result<Vec<String>> {
        match old_name {
            Some(old) if !old.eq_ignore_ascii_case(&column.name) => Ok(vec![format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                self.quote_identifier(&table.name),
                self.quote_identifier(old),
                self.quote_identifier(&column.name)
            )]),
            _ => Ok(Vec::new()),
        }
    }

    fn alter_primary_key(&self, _target: &Table, _current: &Table) -> Vec<String> {
        Vec::new()
    }

    fn add_key(&self, table: &Table, key: &Key) -> Vec<String> {
        vec![self.index_statement(table, key)]
    }

    fn drop_key(&self, _table: &Table, key: &Key) -> Vec<String> {
        vec![format!("DROP INDEX {}", self.quote_identifier(&key.name))]
    }

    fn add_foreign_key(&self, _table: &Table, _foreign_key: &ForeignKey) -> Vec<String> {
        Vec::new()
    }

    fn drop_foreign_key(&self, _table: &Table, _foreign_key: &ForeignKey) -> Vec<String> {
        Vec::new()
    }
}
