//! Connection to the live database.

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use schema_sync_core::dialect::{Dialect, Engine};

use crate::error::Result;
use crate::introspect::{Introspect, LiveSchema, MySqlIntrospector, SqliteIntrospector};

/// A pool for one of the supported engines.
#[derive(Debug, Clone)]
pub enum Database {
    /// MySQL / MariaDB.
    MySql(MySqlPool),
    /// SQLite.
    Sqlite(SqlitePool),
}

impl Database {
    /// Connects to `url` using the pool type of `engine`.
    ///
    /// # Errors
    ///
    /// Fails when the connection cannot be established.
    pub async fn connect(url: &str, engine: Engine) -> Result<Self> {
        let database = match engine {
            Engine::MySql => Self::MySql(
                MySqlPoolOptions::new()
                    .max_connections(5)
                    .connect(url)
                    .await?,
            ),
            // DDL on SQLite must see a single consistent connection.
            Engine::Sqlite => Self::Sqlite(
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(url)
                    .await?,
            ),
        };
        info!(engine = %engine, "Connected to database");
        Ok(database)
    }

    /// Returns the engine behind this connection.
    #[must_use]
    pub const fn engine(&self) -> Engine {
        match self {
            Self::MySql(_) => Engine::MySql,
            Self::Sqlite(_) => Engine::Sqlite,
        }
    }

    /// Runs a single statement.
    ///
    /// # Errors
    ///
    /// Returns the database error reported for the statement.
    pub async fn execute(&self, sql: &str) -> std::result::Result<u64, sqlx::Error> {
        let result = match self {
            Self::MySql(pool) => sqlx::query(sql).execute(pool).await?.rows_affected(),
            Self::Sqlite(pool) => sqlx::query(sql).execute(pool).await?.rows_affected(),
        };
        Ok(result)
    }

    /// Reads all base tables, completed by `dialect`.
    ///
    /// Tables with unsupported column types are listed as unreadable.
    ///
    /// # Errors
    ///
    /// Fails on catalog query errors.
    pub async fn introspect(&self, dialect: &dyn Dialect) -> Result<LiveSchema> {
        match self {
            Self::MySql(pool) => MySqlIntrospector::new(pool, dialect).schema().await,
            Self::Sqlite(pool) => SqliteIntrospector::new(pool, dialect).schema().await,
        }
    }
}
