//! MySQL dialect.
//!
//! The strict production engine: column names are case-sensitive, only a
//! few closely related types are interchangeable and every change can be
//! expressed with `ALTER TABLE`.

use crate::error::Result;
use crate::schema::{Column, ForeignKey, Key, SqlType, Table};

use super::{quote_literal, unsupported, DefaultEquivalence, Dialect};

/// MySQL limits identifiers of indexes and constraints to 64 characters.
const MAX_CONSTRAINT_NAME_LENGTH: usize = 64;

/// Types MySQL reports interchangeably for the same declared column.
const TYPE_FAMILIES: &[&[SqlType]] = &[
    &[SqlType::Boolean, SqlType::Bit],
    &[SqlType::Varchar, SqlType::Char],
    &[SqlType::LongVarchar, SqlType::Clob],
    &[SqlType::LongVarBinary, SqlType::Blob, SqlType::VarBinary],
    &[SqlType::Numeric, SqlType::Decimal],
];

/// MySQL dialect.
#[derive(Debug, Clone)]
pub struct MySqlDialect {
    table_engine: String,
    equivalence: DefaultEquivalence,
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlDialect {
    /// Creates a dialect creating InnoDB tables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table_engine: "InnoDB".to_string(),
            // DECIMAL(10,2) DEFAULT 0 is reported back as 0.00
            equivalence: DefaultEquivalence::standard().with_numeric_tolerance(true),
        }
    }

    /// Sets the storage engine used by `CREATE TABLE`.
    #[must_use]
    pub fn with_table_engine(mut self, engine: impl Into<String>) -> Self {
        self.table_engine = engine.into();
        self
    }

    /// Replaces the default value equivalence rules.
    #[must_use]
    pub fn with_default_equivalence(mut self, equivalence: DefaultEquivalence) -> Self {
        self.equivalence = equivalence;
        self
    }

    fn limit_name(name: &str) -> String {
        name.chars().take(MAX_CONSTRAINT_NAME_LENGTH).collect()
    }

    fn column_definition(&self, column: &Column) -> Result<String> {
        let mut parts = vec![self.quote_identifier(&column.name), self.type_name(column)?];
        if !column.nullable {
            parts.push("NOT NULL".to_string());
        }
        if column.auto_increment {
            parts.push("AUTO_INCREMENT".to_string());
        }
        if let Some(default) = self.default_clause(column) {
            parts.push(default);
        }
        Ok(parts.join(" "))
    }
}

fn length_or(column: &Column, fallback: u32) -> u32 {
    if column.length == 0 {
        fallback
    } else {
        column.length
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn default_equivalence(&self) -> &DefaultEquivalence {
        &self.equivalence
    }

    fn native_type(&self, native: &str) -> Option<SqlType> {
        let native = native.trim().to_ascii_lowercase();
        // MySQL has no real boolean; TINYINT(1) is how BOOLEAN is stored.
        if native.starts_with("tinyint(1)") {
            return Some(SqlType::Bit);
        }
        let base = native
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();
        let sql_type = match base {
            "bit" | "bool" | "boolean" => SqlType::Bit,
            "tinyint" => SqlType::TinyInt,
            "smallint" => SqlType::SmallInt,
            "mediumint" | "int" | "integer" => SqlType::Integer,
            "bigint" => SqlType::BigInt,
            "float" => SqlType::Float,
            "double" | "real" => SqlType::Double,
            "decimal" | "numeric" => SqlType::Decimal,
            "char" | "enum" | "set" => SqlType::Char,
            "varchar" => SqlType::Varchar,
            "tinytext" | "text" | "mediumtext" | "json" => SqlType::LongVarchar,
            "longtext" => SqlType::Clob,
            "date" | "year" => SqlType::Date,
            "time" => SqlType::Time,
            "datetime" | "timestamp" => SqlType::Timestamp,
            "binary" | "geometry" | "point" | "linestring" | "polygon" | "multipoint"
            | "multilinestring" | "multipolygon" | "geometrycollection" | "geomcollection" => {
                SqlType::Binary
            }
            "varbinary" => SqlType::VarBinary,
            "tinyblob" | "blob" | "mediumblob" => SqlType::LongVarBinary,
            "longblob" => SqlType::Blob,
            _ => return None,
        };
        Some(sql_type)
    }

    fn type_name(&self, column: &Column) -> Result<String> {
        let name = match column.sql_type {
            SqlType::BigInt => "BIGINT(20)".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::SmallInt => "SMALLINT".to_string(),
            SqlType::TinyInt => "TINYINT".to_string(),
            SqlType::Boolean | SqlType::Bit => "TINYINT(1)".to_string(),
            SqlType::Double => "DOUBLE".to_string(),
            SqlType::Float => "FLOAT".to_string(),
            SqlType::Decimal | SqlType::Numeric => {
                format!("DECIMAL({},{})", column.precision, column.scale)
            }
            SqlType::Char | SqlType::Varchar => format!("VARCHAR({})", length_or(column, 255)),
            SqlType::LongVarchar | SqlType::Clob => "LONGTEXT".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Blob | SqlType::VarBinary | SqlType::LongVarBinary => "LONGBLOB".to_string(),
            SqlType::Real | SqlType::Binary => return Err(unsupported(column)),
        };
        Ok(name)
    }

    fn complete_table_infos(&self, mut table: Table) -> Table {
        for column in &mut table.columns {
            if self.needs_quotation(column) {
                if let Some(value) = column.default_value.take() {
                    column.default_value = Some(quote_literal(&value));
                }
            }
        }
        // The primary key is also reported as an index.
        table.keys.retain(|k| !k.name.eq_ignore_ascii_case("PRIMARY"));
        table
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn are_types_equal(&self, a: SqlType, b: SqlType) -> bool {
        a == b
            || TYPE_FAMILIES
                .iter()
                .any(|family| family.contains(&a) && family.contains(&b))
    }

    fn effective_key_name(&self, _table: &Table, key: &Key) -> String {
        Self::limit_name(&key.name)
    }

    fn should_drop_key(&self, _target: &Table, current: &Table, key: &Key) -> bool {
        // InnoDB creates an index named after every foreign key.
        current.find_foreign_key(&key.name).is_none()
    }

    fn create_table(&self, table: &Table) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for column in &table.columns {
            lines.push(format!("  {}", self.column_definition(column)?));
        }
        for key in &table.keys {
            let name = self.quote_identifier(&Self::limit_name(&key.name));
            if key.unique {
                lines.push(format!(
                    "  CONSTRAINT {name} UNIQUE ({})",
                    self.quote_list(&key.columns)
                ));
            } else {
                lines.push(format!("  KEY {name} ({})", self.quote_list(&key.columns)));
            }
        }
        // Foreign keys are added in a later pass so tables may reference
        // each other regardless of creation order.
        if !table.primary_key.is_empty() {
            lines.push(format!(
                "  PRIMARY KEY ({})",
                self.quote_list(&table.primary_key)
            ));
        }

        Ok(vec![format!(
            "CREATE TABLE {} (\n{}\n) ENGINE={}",
            self.quote_identifier(&table.name),
            lines.join(",\n"),
            self.table_engine
        )])
    }

    fn add_column(&self, table: &Table, column: &Column) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(&table.name),
            self.column_definition(column)?
        )])
    }

    fn alter_column_to(
        &self,
        table: &Table,
        old_name: Option<&str>,
        column: &Column,
    ) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} CHANGE COLUMN {} {}",
            self.quote_identifier(&table.name),
            self.quote_identifier(old_name.unwrap_or(&column.name)),
            self.column_definition(column)?
        )])
    }

    fn alter_primary_key(&self, target: &Table, current: &Table) -> Vec<String> {
        let table = self.quote_identifier(&target.name);
        let statement = match (current.primary_key.is_empty(), target.primary_key.is_empty()) {
            (true, true) => return Vec::new(),
            (true, false) => format!(
                "ALTER TABLE {table} ADD PRIMARY KEY ({})",
                self.quote_list(&target.primary_key)
            ),
            (false, true) => format!("ALTER TABLE {table} DROP PRIMARY KEY"),
            (false, false) => format!(
                "ALTER TABLE {table} DROP PRIMARY KEY, ADD PRIMARY KEY ({})",
                self.quote_list(&target.primary_key)
            ),
        };
        vec![statement]
    }

    fn add_key(&self, table: &Table, key: &Key) -> Vec<String> {
        let name = self.quote_identifier(&Self::limit_name(&key.name));
        let statement = if key.unique {
            format!(
                "ALTER TABLE {} ADD CONSTRAINT {name} UNIQUE ({})",
                self.quote_identifier(&table.name),
                self.quote_list(&key.columns)
            )
        } else {
            format!(
                "ALTER TABLE {} ADD INDEX {name} ({})",
                self.quote_identifier(&table.name),
                self.quote_list(&key.columns)
            )
        };
        vec![statement]
    }

    fn drop_key(&self, table: &Table, key: &Key) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP INDEX {}",
            self.quote_identifier(&table.name),
            self.quote_identifier(&key.name)
        )]
    }

    fn add_foreign_key(&self, table: &Table, foreign_key: &ForeignKey) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(&table.name),
            self.quote_identifier(&Self::limit_name(&foreign_key.name)),
            self.quote_list(&foreign_key.columns),
            self.quote_identifier(&foreign_key.foreign_table),
            self.quote_list(&foreign_key.foreign_columns)
        )]
    }

    fn drop_foreign_key(&self, table: &Table, foreign_key: &ForeignKey) -> Vec<String> {
        vec![format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.quote_identifier(&table.name),
            self.quote_identifier(&Self::limit_name(&foreign_key.name))
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    fn dialect() -> MySqlDialect {
        MySqlDialect::new()
    }

    fn orders() -> Table {
        Table::new("orders")
            .column(Column::new("id", SqlType::BigInt).auto_increment())
            .column(Column::new("customer_id", SqlType::BigInt).not_null())
            .column(
                Column::new("status", SqlType::Varchar)
                    .length(20)
                    .not_null()
                    .default_value("open"),
            )
            .column(Column::new("total", SqlType::Decimal).precision(10, 2))
            .primary_key(["id"])
            .key(Key::new("idx_status").column("status"))
    }

    #[test]
    fn test_create_table() {
        let sql = dialect().create_table(&orders()).unwrap();
        assert_eq!(sql.len(), 1);
        assert_eq!(
            sql[0],
            "CREATE TABLE `orders` (\n  \
             `id` BIGINT(20) NOT NULL AUTO_INCREMENT,\n  \
             `customer_id` BIGINT(20) NOT NULL,\n  \
             `status` VARCHAR(20) NOT NULL DEFAULT 'open',\n  \
             `total` DECIMAL(10,2),\n  \
             KEY `idx_status` (`status`),\n  \
             PRIMARY KEY (`id`)\n) ENGINE=InnoDB"
        );
    }

    #[test]
    fn test_create_table_custom_engine() {
        let sql = dialect()
            .with_table_engine("MyISAM")
            .create_table(&orders())
            .unwrap();
        assert!(sql[0].ends_with("ENGINE=MyISAM"));
    }

    #[test]
    fn test_type_names() {
        let d = dialect();
        let name = |c: Column| d.type_name(&c).unwrap();
        assert_eq!(name(Column::new("a", SqlType::Boolean)), "TINYINT(1)");
        assert_eq!(name(Column::new("a", SqlType::Char)), "VARCHAR(255)");
        assert_eq!(name(Column::new("a", SqlType::Char).length(12)), "VARCHAR(12)");
        assert_eq!(name(Column::new("a", SqlType::Clob)), "LONGTEXT");
        assert_eq!(name(Column::new("a", SqlType::VarBinary)), "LONGBLOB");
        assert_eq!(
            name(Column::new("a", SqlType::Numeric).precision(8, 3)),
            "DECIMAL(8,3)"
        );
    }

    #[test]
    fn test_unsupported_type() {
        let err = dialect()
            .type_name(&Column::new("hash", SqlType::Binary))
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::UnsupportedType { ref column, .. } if column == "hash"
        ));
    }

    #[test]
    fn test_native_types() {
        let d = dialect();
        assert_eq!(d.native_type("tinyint(1)"), Some(SqlType::Bit));
        assert_eq!(d.native_type("tinyint(4)"), Some(SqlType::TinyInt));
        assert_eq!(d.native_type("bigint(20) unsigned"), Some(SqlType::BigInt));
        assert_eq!(d.native_type("varchar(255)"), Some(SqlType::Varchar));
        assert_eq!(d.native_type("LONGTEXT"), Some(SqlType::Clob));
        assert_eq!(d.native_type("datetime"), Some(SqlType::Timestamp));
        assert_eq!(d.native_type("vector(3)"), None);
    }

    #[test]
    fn test_native_types_reported_like_connector_j() {
        let d = dialect();
        assert_eq!(d.native_type("json"), Some(SqlType::LongVarchar));
        assert_eq!(d.native_type("enum('a','b')"), Some(SqlType::Char));
        assert_eq!(d.native_type("set('x','y')"), Some(SqlType::Char));
        assert_eq!(d.native_type("year"), Some(SqlType::Date));
        assert_eq!(d.native_type("year(4)"), Some(SqlType::Date));
        assert_eq!(d.native_type("geometry"), Some(SqlType::Binary));
        assert_eq!(d.native_type("point"), Some(SqlType::Binary));
    }

    #[test]
    fn test_type_families() {
        let d = dialect();
        assert!(d.are_types_equal(SqlType::Boolean, SqlType::Bit));
        assert!(d.are_types_equal(SqlType::Char, SqlType::Varchar));
        assert!(d.are_types_equal(SqlType::Blob, SqlType::LongVarBinary));
        assert!(!d.are_types_equal(SqlType::Boolean, SqlType::TinyInt));
        assert!(!d.are_types_equal(SqlType::Integer, SqlType::BigInt));
    }

    #[test]
    fn test_columns_equal() {
        let d = dialect();
        let target = Column::new("name", SqlType::Varchar).length(50);
        assert!(d
            .are_columns_equal(&target, &Column::new("name", SqlType::Char).length(50))
            .is_none());
        let reason = d
            .are_columns_equal(&target, &Column::new("name", SqlType::Varchar).length(40))
            .unwrap();
        assert!(reason.contains("lengths differ"));
    }

    #[test]
    fn test_decimal_default_tolerance() {
        let d = dialect();
        let target = Column::new("total", SqlType::Decimal)
            .precision(10, 2)
            .default_value("0");
        let current = Column::new("total", SqlType::Decimal)
            .precision(10, 2)
            .default_value("0.00");
        assert!(d.are_columns_equal(&target, &current).is_none());
    }

    #[test]
    fn test_timestamp_without_default() {
        let d = dialect();
        let target = Column::new("created", SqlType::Timestamp);
        let current = Column::new("created", SqlType::Timestamp)
            .not_null()
            .default_value("'CURRENT_TIMESTAMP'");
        assert!(d.are_columns_equal(&target, &current).is_none());

        let declared = Column::new("created", SqlType::Timestamp).default_value("2020-01-01");
        assert!(d.are_columns_equal(&declared, &current).is_some());
    }

    #[test]
    fn test_complete_table_infos() {
        let table = Table::new("orders")
            .column(Column::new("status", SqlType::Varchar).default_value("open"))
            .column(Column::new("total", SqlType::Decimal).default_value("0.00"))
            .key(Key::new("PRIMARY").column("id").unique())
            .key(Key::new("idx_status").column("status"));
        let table = dialect().complete_table_infos(table);
        assert_eq!(table.columns[0].default_value.as_deref(), Some("'open'"));
        assert_eq!(table.columns[1].default_value.as_deref(), Some("0.00"));
        assert_eq!(table.keys.len(), 1);
        assert_eq!(table.keys[0].name, "idx_status");
    }

    #[test]
    fn test_escaped_default_round_trip() {
        let d = dialect();
        let target = Column::new("note", SqlType::Varchar)
            .length(20)
            .default_value("it's");
        let table = d.complete_table_infos(Table::new("t").column(target.clone()));
        let current = &table.columns[0];

        assert_eq!(current.default_value.as_deref(), Some("'it''s'"));
        assert!(d.are_columns_equal(&target, current).is_none());
        assert!(crate::diff::reconcile(&d, &[Table::new("t").column(target)], &[table], false)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_key_names_are_limited() {
        let long = "k".repeat(80);
        let name = dialect().effective_key_name(&orders(), &Key::new(long));
        assert_eq!(name.len(), 64);
    }

    #[test]
    fn test_should_not_drop_foreign_key_index() {
        let current = orders().foreign_key(
            ForeignKey::new("fk_orders_customer", "customers").column("customer_id", "id"),
        );
        let d = dialect();
        assert!(!d.should_drop_key(&orders(), &current, &Key::new("fk_orders_customer")));
        assert!(d.should_drop_key(&orders(), &current, &Key::new("idx_other")));
    }

    #[test]
    fn test_alter_statements() {
        let d = dialect();
        let table = orders();
        let status = Column::new("state", SqlType::Varchar).length(20).not_null();
        assert_eq!(
            d.alter_column_to(&table, Some("status"), &status).unwrap(),
            vec!["ALTER TABLE `orders` CHANGE COLUMN `status` `state` VARCHAR(20) NOT NULL"]
        );

        let current = Table::new("orders").primary_key(["id"]);
        let target = Table::new("orders").primary_key(["id", "customer_id"]);
        assert_eq!(
            d.alter_primary_key(&target, &current),
            vec!["ALTER TABLE `orders` DROP PRIMARY KEY, ADD PRIMARY KEY (`id`, `customer_id`)"]
        );
        assert_eq!(
            d.alter_primary_key(&target, &Table::new("orders")),
            vec!["ALTER TABLE `orders` ADD PRIMARY KEY (`id`, `customer_id`)"]
        );

        let from = Key::new("idx_status").column("status");
        let to = Key::new("idx_status").column("status").column("total").unique();
        assert_eq!(
            d.alter_key(&table, &from, &to),
            vec![
                "ALTER TABLE `orders` DROP INDEX `idx_status`",
                "ALTER TABLE `orders` ADD CONSTRAINT `idx_status` UNIQUE (`status`, `total`)",
            ]
        );
    }

    #[test]
    fn test_foreign_key_statements() {
        let d = dialect();
        let fk = ForeignKey::new("fk_orders_customer", "customers").column("customer_id", "id");
        assert_eq!(
            d.add_foreign_key(&orders(), &fk),
            vec!["ALTER TABLE `orders` ADD CONSTRAINT `fk_orders_customer` FOREIGN KEY (`customer_id`) REFERENCES `customers` (`id`)"]
        );
        assert_eq!(
            d.drop_foreign_key(&orders(), &fk),
            vec!["ALTER TABLE `orders` DROP FOREIGN KEY `fk_orders_customer`"]
        );
    }
}
