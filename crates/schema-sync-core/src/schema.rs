//! Schema representation types.
//!
//! The same types describe both sides of a comparison: the target schema an
//! application declares and the current schema read back from a live
//! database. Only the target side ever carries rename hints (`old_name`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Portable column type codes.
///
/// Discriminants follow the JDBC `java.sql.Types` constants so codes read
/// from or written to other tooling stay interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(i32)]
pub enum SqlType {
    /// Single bit, commonly used as a flag.
    Bit = -7,
    /// 8-bit integer.
    TinyInt = -6,
    /// 16-bit integer.
    SmallInt = 5,
    /// 32-bit integer.
    Integer = 4,
    /// 64-bit integer.
    BigInt = -5,
    /// Floating point (double precision in most engines).
    Float = 6,
    /// Floating point (single precision).
    Real = 7,
    /// Floating point (double precision).
    Double = 8,
    /// Exact numeric with precision and scale.
    Numeric = 2,
    /// Exact numeric with precision and scale.
    Decimal = 3,
    /// Fixed-length character string.
    Char = 1,
    /// Variable-length character string.
    Varchar = 12,
    /// Long character string.
    LongVarchar = -1,
    /// Date only.
    Date = 91,
    /// Time only.
    Time = 92,
    /// Date and time.
    Timestamp = 93,
    /// Fixed-length binary data.
    Binary = -2,
    /// Variable-length binary data.
    VarBinary = -3,
    /// Long binary data.
    LongVarBinary = -4,
    /// Binary large object.
    Blob = 2004,
    /// Character large object.
    Clob = 2005,
    /// Boolean.
    Boolean = 16,
}

impl SqlType {
    /// All known portable types.
    pub const ALL: [Self; 22] = [
        Self::Bit,
        Self::TinyInt,
        Self::SmallInt,
        Self::Integer,
        Self::BigInt,
        Self::Float,
        Self::Real,
        Self::Double,
        Self::Numeric,
        Self::Decimal,
        Self::Char,
        Self::Varchar,
        Self::LongVarchar,
        Self::Date,
        Self::Time,
        Self::Timestamp,
        Self::Binary,
        Self::VarBinary,
        Self::LongVarBinary,
        Self::Blob,
        Self::Clob,
        Self::Boolean,
    ];

    /// Returns the integer type code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks up a type by its integer code.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownTypeCode`] for codes outside the known set.
    pub fn from_code(code: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(SchemaError::UnknownTypeCode(code))
    }

    /// Returns the portable type name, e.g. `VARCHAR`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bit => "BIT",
            Self::TinyInt => "TINYINT",
            Self::SmallInt => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Float => "FLOAT",
            Self::Real => "REAL",
            Self::Double => "DOUBLE",
            Self::Numeric => "NUMERIC",
            Self::Decimal => "DECIMAL",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::LongVarchar => "LONGVARCHAR",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Binary => "BINARY",
            Self::VarBinary => "VARBINARY",
            Self::LongVarBinary => "LONGVARBINARY",
            Self::Blob => "BLOB",
            Self::Clob => "CLOB",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const fn default_true() -> bool {
    true
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Previous name of the column, used to detect renames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
    /// Portable type.
    #[serde(rename = "type")]
    pub sql_type: SqlType,
    /// Length for character and binary types.
    #[serde(default)]
    pub length: u32,
    /// Precision for exact numeric types.
    #[serde(default)]
    pub precision: u32,
    /// Scale for exact numeric types.
    #[serde(default)]
    pub scale: u32,
    /// Whether the column allows NULL values.
    #[serde(default = "default_true")]
    pub nullable: bool,
    /// Whether values are generated by the database.
    #[serde(default)]
    pub auto_increment: bool,
    /// Default value in its raw, dialect-specific textual form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl Column {
    /// Creates a nullable column without default.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            old_name: None,
            sql_type,
            length: 0,
            precision: 0,
            scale: 0,
            nullable: true,
            auto_increment: false,
            default_value: None,
        }
    }

    /// Sets the rename hint.
    #[must_use]
    pub fn old_name(mut self, name: impl Into<String>) -> Self {
        self.old_name = Some(name.into());
        self
    }

    /// Sets the length.
    #[must_use]
    pub const fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    /// Sets precision and scale.
    #[must_use]
    pub const fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as auto-increment (implies NOT NULL).
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.nullable = false;
        self
    }

    /// Sets the raw default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// An index, optionally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Index name.
    pub name: String,
    /// Participating columns in order.
    pub columns: Vec<String>,
    /// Whether the index enforces uniqueness.
    #[serde(default)]
    pub unique: bool,
}

impl Key {
    /// Creates a non-unique key without columns.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique: false,
        }
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Marks the key as unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Whether both keys cover the same ordered columns with the same
    /// uniqueness, ignoring names.
    #[must_use]
    pub fn same_structure(&self, other: &Self) -> bool {
        self.unique == other.unique && names_equal(&self.columns, &other.columns)
    }
}

/// A foreign key constraint. Local and foreign columns pair up by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub foreign_table: String,
    /// Referenced columns.
    pub foreign_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates a foreign key referencing `foreign_table`.
    #[must_use]
    pub fn new(name: impl Into<String>, foreign_table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_table: foreign_table.into(),
            foreign_columns: Vec::new(),
        }
    }

    /// Appends a local/foreign column pair.
    #[must_use]
    pub fn column(mut self, local: impl Into<String>, foreign: impl Into<String>) -> Self {
        self.columns.push(local.into());
        self.foreign_columns.push(foreign.into());
        self
    }

    /// Whether both constraints link the same columns to the same table.
    #[must_use]
    pub fn same_structure(&self, other: &Self) -> bool {
        self.foreign_table.eq_ignore_ascii_case(&other.foreign_table)
            && names_equal(&self.columns, &other.columns)
            && names_equal(&self.foreign_columns, &other.foreign_columns)
    }
}

/// A table with its columns, primary key, keys and foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Previous name of the table, used to detect renames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_name: Option<String>,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Primary key columns in key order.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Secondary indexes.
    #[serde(default)]
    pub keys: Vec<Key>,
    /// Foreign key constraints.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_name: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
            keys: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Sets the rename hint.
    #[must_use]
    pub fn old_name(mut self, name: impl Into<String>) -> Self {
        self.old_name = Some(name.into());
        self
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary key columns.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a key.
    #[must_use]
    pub fn key(mut self, key: Key) -> Self {
        self.keys.push(key);
        self
    }

    /// Appends a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Finds a key by name, ignoring case.
    #[must_use]
    pub fn find_key(&self, name: &str) -> Option<&Key> {
        self.keys.iter().find(|k| k.name.eq_ignore_ascii_case(name))
    }

    /// Finds a foreign key by name, ignoring case.
    #[must_use]
    pub fn find_foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.name.eq_ignore_ascii_case(name))
    }

    /// Whether `column` takes part in the primary key.
    #[must_use]
    pub fn is_primary_key_column(&self, column: &str) -> bool {
        self.primary_key
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Compares two ordered name lists, ignoring case.
#[must_use]
pub fn names_equal(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_codes() {
        assert_eq!(SqlType::Varchar.code(), 12);
        assert_eq!(SqlType::Clob.code(), 2005);
        assert_eq!(SqlType::from_code(-5).unwrap(), SqlType::BigInt);
        assert!(matches!(
            SqlType::from_code(4711),
            Err(SchemaError::UnknownTypeCode(4711))
        ));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(SqlType::LongVarBinary.to_string(), "LONGVARBINARY");
        for t in SqlType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.name()));
        }
    }

    #[test]
    fn test_column_builder() {
        let col = Column::new("price", SqlType::Decimal)
            .precision(10, 2)
            .not_null()
            .default_value("0");
        assert_eq!(col.precision, 10);
        assert_eq!(col.scale, 2);
        assert!(!col.nullable);
        assert_eq!(col.default_value.as_deref(), Some("0"));

        let id = Column::new("id", SqlType::BigInt).auto_increment();
        assert!(!id.nullable);
    }

    #[test]
    fn test_table_from_json() {
        let json = r#"{
            "name": "orders",
            "columns": [
                {"name": "id", "type": "BIGINT", "nullable": false, "auto_increment": true},
                {"name": "note", "type": "VARCHAR", "length": 255}
            ],
            "primary_key": ["id"]
        }"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert!(table.columns[1].nullable);
        assert_eq!(table.columns[1].sql_type, SqlType::Varchar);
        assert!(table.keys.is_empty());
    }

    #[test]
    fn test_key_structure() {
        let a = Key::new("a").column("x").column("y").unique();
        let b = Key::new("b").column("X").column("Y").unique();
        let c = Key::new("a").column("y").column("x").unique();
        assert!(a.same_structure(&b));
        assert!(!a.same_structure(&c));
        assert!(!a.same_structure(&Key::new("a").column("x").column("y")));
    }

    #[test]
    fn test_foreign_key_structure() {
        let a = ForeignKey::new("fk", "customers").column("customer_id", "id");
        let b = ForeignKey::new("other", "CUSTOMERS").column("customer_id", "id");
        let c = ForeignKey::new("fk", "accounts").column("customer_id", "id");
        assert!(a.same_structure(&b));
        assert!(!a.same_structure(&c));
    }
}
