//! Reconciliation against a live database.

use tokio_util::sync::CancellationToken;

use schema_sync_core::action::UpdateAction;
use schema_sync_core::dialect::Dialect;
use schema_sync_core::diff::{DiffOptions, SchemaDiff};
use schema_sync_core::schema::Table;

use crate::config::SyncConfig;
use crate::database::Database;
use crate::error::Result;
use crate::executor::{ExecutionSummary, Executor};
use crate::introspect::LiveSchema;

/// A connected database together with the dialect and run settings.
pub struct SchemaSync {
    database: Database,
    dialect: Box<dyn Dialect>,
    config: SyncConfig,
}

impl SchemaSync {
    /// Connects using `config`.
    ///
    /// # Errors
    ///
    /// Fails when the URL names no supported engine or the connection
    /// cannot be established.
    pub async fn connect(config: SyncConfig) -> Result<Self> {
        let engine = config.engine()?;
        let dialect = config.dialect()?;
        let database = Database::connect(&config.database_url, engine).await?;
        Ok(Self {
            database,
            dialect,
            config,
        })
    }

    /// Wraps an existing connection.
    ///
    /// The configured engine is ignored in favor of the connection's.
    ///
    /// # Errors
    ///
    /// Fails when no dialect can be built for the connection.
    pub fn with_database(database: Database, mut config: SyncConfig) -> Result<Self> {
        config.engine = Some(database.engine());
        let dialect = config.dialect()?;
        Ok(Self {
            database,
            dialect,
            config,
        })
    }

    /// The dialect in use.
    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// The run configuration.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reads the current schema of the database.
    ///
    /// # Errors
    ///
    /// Fails on catalog errors.
    pub async fn inspect(&self) -> Result<LiveSchema> {
        self.database.introspect(self.dialect()).await
    }

    /// Plans the actions reconciling the database with `targets`.
    ///
    /// # Errors
    ///
    /// Fails when the current schema cannot be read, a declared table has
    /// unsupported column types, or a declared column cannot be expressed
    /// by the dialect.
    pub async fn plan(&self, targets: &[Table]) -> Result<Vec<UpdateAction>> {
        let currents = self
            .inspect()
            .await?
            .into_tables(targets, self.dialect())?;
        let options = DiffOptions {
            drop_tables: self.config.drop_tables,
        };
        Ok(SchemaDiff::with_options(self.dialect(), options).reconcile(targets, &currents)?)
    }

    /// Builds an executor following the configured policy and dry-run mode.
    #[must_use]
    pub fn executor(&self, cancel_token: CancellationToken) -> Executor {
        Executor::new(self.database.clone())
            .policy(self.config.policy)
            .dry_run(self.config.dry_run)
            .cancel_token(cancel_token)
    }

    /// Plans and executes in one step.
    ///
    /// # Errors
    ///
    /// Fails when planning fails. Statement failures are recorded on the
    /// returned actions.
    pub async fn apply(
        &self,
        targets: &[Table],
        cancel_token: CancellationToken,
    ) -> Result<(Vec<UpdateAction>, ExecutionSummary)> {
        let mut actions = self.plan(targets).await?;
        let summary = self.executor(cancel_token).execute(&mut actions).await;
        Ok((actions, summary))
    }
}
