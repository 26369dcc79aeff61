//! SQLite introspection via `sqlite_master` and the schema pragmas.
//!
//! `PRAGMA foreign_key_list` does not report constraint names, so they are
//! recovered from the stored `CREATE TABLE` statement by matching the
//! constrained columns.

use std::sync::LazyLock;

use regex::Regex;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use schema_sync_core::dialect::{split_type_args, Dialect};
use schema_sync_core::schema::{names_equal, Column, ForeignKey, SqlType, Table};

use super::{push_key_column, unsupported, Introspect, LiveSchema};
use crate::error::Result;

const TABLES_SQL: &str = r"
    SELECT name, sql FROM sqlite_master
    WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\'
    ORDER BY name
";

/// `CONSTRAINT <name> FOREIGN KEY (<columns>)` with any identifier quoting.
static FOREIGN_KEY_CONSTRAINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)CONSTRAINT\s+(?:"([^"]+)"|`([^`]+)`|\[([^\]]+)\]|(\w+))\s+FOREIGN\s+KEY\s*\(([^)]*)\)"#,
    )
    .expect("Invalid foreign key constraint regex")
});

/// Reads tables from a SQLite database.
pub struct SqliteIntrospector<'a> {
    pool: &'a SqlitePool,
    dialect: &'a dyn Dialect,
}

impl<'a> SqliteIntrospector<'a> {
    /// Creates an introspector completing tables with `dialect`.
    #[must_use]
    pub fn new(pool: &'a SqlitePool, dialect: &'a dyn Dialect) -> Self {
        Self { pool, dialect }
    }

    async fn load_table(&self, name: String, sql: &str) -> Result<Table> {
        let mut table = Table::new(name);
        self.load_columns(&mut table).await?;

        if table.primary_key.len() == 1 && sql.to_ascii_uppercase().contains("AUTOINCREMENT") {
            let pk = table.primary_key[0].clone();
            if let Some(column) = table.columns.iter_mut().find(|c| c.name == pk) {
                column.auto_increment = true;
            }
        }

        self.load_keys(&mut table).await?;
        self.load_foreign_keys(&mut table, sql).await?;
        debug!(
            table = %table.name,
            columns = table.columns.len(),
            keys = table.keys.len(),
            foreign_keys = table.foreign_keys.len(),
            "Loaded table"
        );
        Ok(self.dialect.complete_table_infos(table))
    }

    async fn load_columns(&self, table: &mut Table) -> Result<()> {
        let query = format!(
            "PRAGMA table_info({})",
            self.dialect.quote_identifier(&table.name)
        );
        let rows: Vec<SqliteRow> = sqlx::query(&query).fetch_all(self.pool).await?;

        let mut primary_key: Vec<(i64, String)> = Vec::new();
        for row in rows {
            let name: String = row.try_get("name")?;
            let native: String = row.try_get("type")?;
            let sql_type = self
                .dialect
                .native_type(&native)
                .ok_or_else(|| unsupported(&native, &table.name, &name))?;

            let mut column = Column::new(name.clone(), sql_type);
            apply_type_args(&mut column, &native);
            column.nullable = row.try_get::<i64, _>("notnull")? == 0;
            column.default_value = row.try_get("dflt_value")?;

            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                primary_key.push((pk, name));
            }
            table.columns.push(column);
        }

        primary_key.sort_by_key(|(position, _)| *position);
        table.primary_key = primary_key.into_iter().map(|(_, name)| name).collect();
        Ok(())
    }

    async fn load_keys(&self, table: &mut Table) -> Result<()> {
        let query = format!(
            "PRAGMA index_list({})",
            self.dialect.quote_identifier(&table.name)
        );
        let indexes: Vec<SqliteRow> = sqlx::query(&query).fetch_all(self.pool).await?;

        let mut names = Vec::with_capacity(indexes.len());
        for index in indexes {
            let name: String = index.try_get("name")?;
            let unique = index.try_get::<i64, _>("unique")? == 1;
            names.push((name, unique));
        }
        names.sort();

        for (name, unique) in names {
            let query = format!("PRAGMA index_info({})", self.dialect.quote_identifier(&name));
            let rows: Vec<SqliteRow> = sqlx::query(&query).fetch_all(self.pool).await?;

            let mut columns: Vec<(i64, String)> = Vec::new();
            for row in rows {
                // Expression indexes have no column name.
                if let Some(column) = row.try_get::<Option<String>, _>("name")? {
                    columns.push((row.try_get("seqno")?, column));
                }
            }
            columns.sort_by_key(|(seqno, _)| *seqno);
            for (_, column) in columns {
                push_key_column(&mut table.keys, &name, column, unique);
            }
        }
        Ok(())
    }

    async fn load_foreign_keys(&self, table: &mut Table, sql: &str) -> Result<()> {
        let query = format!(
            "PRAGMA foreign_key_list({})",
            self.dialect.quote_identifier(&table.name)
        );
        let rows: Vec<SqliteRow> = sqlx::query(&query).fetch_all(self.pool).await?;

        let mut entries: Vec<(i64, i64, String, String, String)> = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push((
                row.try_get("id")?,
                row.try_get("seq")?,
                row.try_get("table")?,
                row.try_get("from")?,
                row.try_get::<Option<String>, _>("to")?.unwrap_or_default(),
            ));
        }
        entries.sort_by_key(|(id, seq, ..)| (*id, *seq));

        let mut grouped: Vec<(i64, ForeignKey)> = Vec::new();
        for (id, _, foreign_table, column, foreign_column) in entries {
            match grouped.iter_mut().find(|(other, _)| *other == id) {
                Some((_, fk)) => {
                    fk.columns.push(column);
                    fk.foreign_columns.push(foreign_column);
                }
                None => grouped.push((
                    id,
                    ForeignKey::new(String::new(), foreign_table).column(column, foreign_column),
                )),
            }
        }

        let declared = declared_foreign_keys(sql);
        for (id, mut fk) in grouped {
            fk.name = declared
                .iter()
                .find(|(_, columns)| names_equal(columns, &fk.columns))
                .map_or_else(|| format!("{}_fk_{id}", table.name), |(name, _)| name.clone());
            table.foreign_keys.push(fk);
        }
        Ok(())
    }
}

impl Introspect for SqliteIntrospector<'_> {
    async fn schema(&self) -> Result<LiveSchema> {
        let rows: Vec<SqliteRow> = sqlx::query(TABLES_SQL).fetch_all(self.pool).await?;

        let mut schema = LiveSchema::default();
        for row in rows {
            let name: String = row.try_get("name")?;
            let sql: Option<String> = row.try_get("sql")?;
            let table = self
                .load_table(name.clone(), sql.as_deref().unwrap_or_default())
                .await;
            schema.push(name, table)?;
        }

        info!(
            tables = schema.tables.len(),
            unreadable = schema.unreadable.len(),
            "Read SQLite schema"
        );
        Ok(schema)
    }
}

/// Fills length, precision and scale from a declared type like
/// `VARCHAR(50)` or `DECIMAL(10,2)`.
fn apply_type_args(column: &mut Column, native: &str) {
    let (_, args) = split_type_args(native);
    match args.as_slice() {
        [length] if is_sized(column.sql_type) => column.length = *length,
        [precision] => column.precision = *precision,
        [precision, scale, ..] => {
            column.precision = *precision;
            column.scale = *scale;
        }
        _ => {}
    }
}

const fn is_sized(sql_type: SqlType) -> bool {
    matches!(
        sql_type,
        SqlType::Char | SqlType::Varchar | SqlType::Binary | SqlType::VarBinary
    )
}

/// Extracts named foreign key constraints and their local columns from a
/// `CREATE TABLE` statement.
fn declared_foreign_keys(sql: &str) -> Vec<(String, Vec<String>)> {
    FOREIGN_KEY_CONSTRAINT
        .captures_iter(sql)
        .filter_map(|caps| {
            let name = (1..=4).find_map(|i| caps.get(i))?.as_str().to_string();
            let columns = caps
                .get(5)?
                .as_str()
                .split(',')
                .map(|c| {
                    c.trim()
                        .trim_matches(|ch| matches!(ch, '"' | '`' | '[' | ']'))
                        .to_string()
                })
                .collect();
            Some((name, columns))
        })
        .collect()
}
