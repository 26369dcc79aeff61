//! Run configuration and target schema loading.

use std::path::Path;

use serde::{Deserialize, Serialize};

use schema_sync_core::dialect::{Dialect, Engine, MySqlDialect, SqliteDialect};
use schema_sync_core::schema::Table;

use crate::error::{Result, SyncError};

/// Which actions the executor may run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// Run only actions that cannot lose data.
    #[default]
    SafeOnly,
    /// Run every action, including drops and alters.
    All,
}

impl ExecutionPolicy {
    /// Derives the policy from an "allow data loss" switch.
    #[must_use]
    pub const fn from_allow_data_loss(allow: bool) -> Self {
        if allow {
            Self::All
        } else {
            Self::SafeOnly
        }
    }
}

/// Configuration for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Connection URL, `mysql://...` or `sqlite:...`.
    pub database_url: String,
    /// Engine override; derived from the URL when absent.
    #[serde(default)]
    pub engine: Option<Engine>,
    /// Storage engine for tables created on MySQL.
    #[serde(default)]
    pub mysql_table_engine: Option<String>,
    /// Whether undeclared tables are dropped.
    #[serde(default)]
    pub drop_tables: bool,
    /// Which actions may run.
    #[serde(default)]
    pub policy: ExecutionPolicy,
    /// Log statements instead of running them.
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncConfig {
    /// Creates a configuration with safe defaults for `database_url`.
    #[must_use]
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            engine: None,
            mysql_table_engine: None,
            drop_tables: false,
            policy: ExecutionPolicy::SafeOnly,
            dry_run: false,
        }
    }

    /// Returns the engine, from the override or the URL scheme.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnsupportedUrl`] when neither names an engine.
    pub fn engine(&self) -> Result<Engine> {
        self.engine
            .or_else(|| Engine::from_url(&self.database_url))
            .ok_or_else(|| SyncError::UnsupportedUrl(self.database_url.clone()))
    }

    /// Builds the dialect for the configured engine.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnsupportedUrl`] when no engine can be derived.
    pub fn dialect(&self) -> Result<Box<dyn Dialect>> {
        let dialect: Box<dyn Dialect> = match self.engine()? {
            Engine::MySql => {
                let mut dialect = MySqlDialect::new();
                if let Some(engine) = &self.mysql_table_engine {
                    dialect = dialect.with_table_engine(engine.clone());
                }
                Box::new(dialect)
            }
            Engine::Sqlite => Box::new(SqliteDialect::new()),
        };
        Ok(dialect)
    }
}

/// Accepted layouts of a target schema file.
#[derive(Deserialize)]
#[serde(untagged)]
enum TargetFile {
    Tables(Vec<Table>),
    Schema { tables: Vec<Table> },
}

/// Parses a target schema from JSON, either a list of tables or an object
/// with a `tables` list.
///
/// # Errors
///
/// Fails when the JSON does not describe tables.
pub fn parse_target_schema(json: &str) -> std::result::Result<Vec<Table>, serde_json::Error> {
    let file: TargetFile = serde_json::from_str(json)?;
    Ok(match file {
        TargetFile::Tables(tables) | TargetFile::Schema { tables } => tables,
    })
}

/// Loads a target schema file.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_target_schema(path: &Path) -> Result<Vec<Table>> {
    let json = std::fs::read_to_string(path)?;
    parse_target_schema(&json).map_err(|source| SyncError::InvalidTargetSchema {
        path: path.to_path_buf(),
        source,
    })
}
