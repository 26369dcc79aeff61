//! MySQL introspection via `INFORMATION_SCHEMA`.
//!
//! All queries are scoped to the schema of the connection (`DATABASE()`).
//! Text columns are cast to `CHAR` since some server collations report
//! catalog columns as `VARBINARY`.

use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;
use tracing::{debug, info};

use schema_sync_core::dialect::Dialect;
use schema_sync_core::schema::{Column, Table};

use super::{push_foreign_key_column, push_key_column, to_u32, unsupported, Introspect, LiveSchema};
use crate::error::Result;

const TABLES_SQL: &str = r"
    SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
    ORDER BY TABLE_NAME
";

const COLUMNS_SQL: &str = r"
    SELECT
        CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(COLUMN_TYPE AS CHAR(255)) AS COLUMN_TYPE,
        CAST(COALESCE(CHARACTER_MAXIMUM_LENGTH, 0) AS SIGNED) AS max_length,
        CAST(COALESCE(NUMERIC_PRECISION, 0) AS SIGNED) AS num_precision,
        CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS num_scale,
        CAST(IF(IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS is_nullable,
        CAST(IF(EXTRA LIKE '%auto_increment%', 1, 0) AS SIGNED) AS is_identity,
        CAST(COLUMN_DEFAULT AS CHAR) AS COLUMN_DEFAULT
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
";

const PRIMARY_KEY_SQL: &str = r"
    SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
    FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND CONSTRAINT_NAME = 'PRIMARY'
    ORDER BY ORDINAL_POSITION
";

const INDEXES_SQL: &str = r"
    SELECT
        CAST(INDEX_NAME AS CHAR(255)) AS INDEX_NAME,
        CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(IF(NON_UNIQUE = 0, 1, 0) AS SIGNED) AS is_unique
    FROM INFORMATION_SCHEMA.STATISTICS
    WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
    ORDER BY INDEX_NAME, SEQ_IN_INDEX
";

const FOREIGN_KEYS_SQL: &str = r"
    SELECT
        CAST(rc.CONSTRAINT_NAME AS CHAR(255)) AS CONSTRAINT_NAME,
        CAST(kcu.COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
        CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS REFERENCED_TABLE_NAME,
        CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS REFERENCED_COLUMN_NAME
    FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
        ON rc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
        AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
        AND rc.TABLE_NAME = kcu.TABLE_NAME
    WHERE rc.CONSTRAINT_SCHEMA = DATABASE() AND rc.TABLE_NAME = ?
    ORDER BY rc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
";

/// Reads tables from a MySQL catalog.
pub struct MySqlIntrospector<'a> {
    pool: &'a MySqlPool,
    dialect: &'a dyn Dialect,
}

impl<'a> MySqlIntrospector<'a> {
    /// Creates an introspector completing tables with `dialect`.
    #[must_use]
    pub fn new(pool: &'a MySqlPool, dialect: &'a dyn Dialect) -> Self {
        Self { pool, dialect }
    }

    async fn load_table(&self, name: String) -> Result<Table> {
        let mut table = Table::new(name);
        self.load_columns(&mut table).await?;
        self.load_primary_key(&mut table).await?;
        self.load_keys(&mut table).await?;
        self.load_foreign_keys(&mut table).await?;
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
        let rows: Vec<MySqlRow> = sqlx::query(COLUMNS_SQL)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        for row in rows {
            let name: String = row.try_get("COLUMN_NAME")?;
            let native: String = row.try_get("COLUMN_TYPE")?;
            let sql_type = self
                .dialect
                .native_type(&native)
                .ok_or_else(|| unsupported(&native, &table.name, &name))?;

            let mut column = Column::new(name, sql_type);
            column.length = to_u32(row.try_get("max_length")?);
            column.precision = to_u32(row.try_get("num_precision")?);
            column.scale = to_u32(row.try_get("num_scale")?);
            column.nullable = row.try_get::<i64, _>("is_nullable")? == 1;
            column.auto_increment = row.try_get::<i64, _>("is_identity")? == 1;
            column.default_value = row.try_get("COLUMN_DEFAULT")?;
            table.columns.push(column);
        }
        Ok(())
    }

    async fn load_primary_key(&self, table: &mut Table) -> Result<()> {
        let rows: Vec<MySqlRow> = sqlx::query(PRIMARY_KEY_SQL)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        for row in rows {
            table.primary_key.push(row.try_get("COLUMN_NAME")?);
        }
        Ok(())
    }

    async fn load_keys(&self, table: &mut Table) -> Result<()> {
        let rows: Vec<MySqlRow> = sqlx::query(INDEXES_SQL)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        for row in rows {
            let name: String = row.try_get("INDEX_NAME")?;
            // Functional indexes have no column name.
            let Some(column) = row.try_get::<Option<String>, _>("COLUMN_NAME")? else {
                continue;
            };
            let unique = row.try_get::<i64, _>("is_unique")? == 1;
            push_key_column(&mut table.keys, &name, column, unique);
        }
        Ok(())
    }

    async fn load_foreign_keys(&self, table: &mut Table) -> Result<()> {
        let rows: Vec<MySqlRow> = sqlx::query(FOREIGN_KEYS_SQL)
            .bind(&table.name)
            .fetch_all(self.pool)
            .await?;

        for row in rows {
            let name: String = row.try_get("CONSTRAINT_NAME")?;
            let foreign_table: String = row.try_get("REFERENCED_TABLE_NAME")?;
            push_foreign_key_column(
                &mut table.foreign_keys,
                &name,
                &foreign_table,
                row.try_get("COLUMN_NAME")?,
                row.try_get("REFERENCED_COLUMN_NAME")?,
            );
        }
        Ok(())
    }
}

impl Introspect for MySqlIntrospector<'_> {
    async fn schema(&self) -> Result<LiveSchema> {
        let rows: Vec<MySqlRow> = sqlx::query(TABLES_SQL).fetch_all(self.pool).await?;

        let mut schema = LiveSchema::default();
        for row in rows {
            let name: String = row.try_get("TABLE_NAME")?;
            let table = self.load_table(name.clone()).await;
            schema.push(name, table)?;
        }

        info!(
            tables = schema.tables.len(),
            unreadable = schema.unreadable.len(),
            "Read MySQL schema"
        );
        Ok(schema)
    }
}
