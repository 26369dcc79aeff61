//! Update action executor.
//!
//! Runs planned actions against the database, one statement at a time, and
//! records each outcome on its action. A failing statement never aborts the
//! run: the error is kept on the action and execution moves on.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use schema_sync_core::action::UpdateAction;

use crate::config::ExecutionPolicy;
use crate::database::Database;
use crate::error::{Result, SyncError};

/// Counts of one execution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    /// Actions that ran without error.
    pub executed: usize,
    /// Actions with at least one failing statement.
    pub failed: usize,
    /// Actions withheld because they may lose data.
    pub skipped: usize,
    /// Actions printed instead of executed in dry-run mode.
    pub previewed: usize,
    /// Whether the run stopped early on cancellation.
    pub cancelled: bool,
}

impl ExecutionSummary {
    fn log(&self) {
        if self.executed + self.failed + self.skipped + self.previewed == 0 {
            if !self.cancelled {
                info!("Schema is up to date");
            }
            return;
        }
        if self.previewed > 0 {
            info!(
                previewed = self.previewed,
                skipped = self.skipped,
                "Dry run: {} schema change actions would be executed. {} were skipped due to possible data loss",
                self.previewed,
                self.skipped
            );
            return;
        }
        info!(
            executed = self.executed,
            failed = self.failed,
            skipped = self.skipped,
            cancelled = self.cancelled,
            "Executed {} schema change actions of which {} failed. {} were skipped due to possible data loss",
            self.executed + self.failed,
            self.failed,
            self.skipped
        );
    }
}

/// What happened to a single action.
enum Outcome {
    Executed,
    Failed,
    Cancelled,
    DryRun,
}

/// Executes update actions against a database.
pub struct Executor {
    database: Database,
    policy: ExecutionPolicy,
    dry_run: bool,
    cancel_token: CancellationToken,
}

impl Executor {
    /// Creates an executor running only actions without data loss.
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self {
            database,
            policy: ExecutionPolicy::SafeOnly,
            dry_run: false,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Sets which actions may run.
    #[must_use]
    pub const fn policy(mut self, policy: ExecutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables dry-run mode (SQL is printed but not executed).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Stops execution before the next statement once `token` is cancelled.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Executes `actions` in order, honoring the policy.
    ///
    /// Stops before the next statement once cancelled; actions not reached
    /// stay unexecuted. An action interrupted after some of its statements
    /// ran is recorded as failed with the number of statements completed.
    pub async fn execute(&self, actions: &mut [UpdateAction]) -> ExecutionSummary {
        let mut summary = ExecutionSummary::default();

        for action in actions.iter_mut() {
            if action.data_loss_possible && self.policy == ExecutionPolicy::SafeOnly {
                debug!(id = %action.id, reason = %action.reason, "Skipping action with possible data loss");
                summary.skipped += 1;
                continue;
            }
            match self.run(action).await {
                Outcome::Executed => summary.executed += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::DryRun => summary.previewed += 1,
                Outcome::Cancelled => {
                    summary.cancelled = true;
                    break;
                }
            }
        }

        summary.log();
        summary
    }

    /// Executes the single action with the given id, regardless of policy.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ActionNotFound`] when no action has that id.
    pub async fn execute_by_id<'a>(
        &self,
        actions: &'a mut [UpdateAction],
        id: &str,
    ) -> Result<&'a UpdateAction> {
        let action = actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| SyncError::ActionNotFound(id.to_string()))?;
        self.run(action).await;
        Ok(action)
    }

    async fn run(&self, action: &mut UpdateAction) -> Outcome {
        info!(id = %action.id, reason = %action.reason, "Executing schema change");

        let mut last_error = None;
        let mut cancelled_at = None;
        let total = action.statements.len();
        for (done, sql) in action.statements.iter().enumerate() {
            if self.cancel_token.is_cancelled() {
                warn!(id = %action.id, done, total, "Execution cancelled");
                cancelled_at = Some(done);
                break;
            }
            debug!(sql = %sql, "Executing SQL");

            if self.dry_run {
                println!("{sql};");
                continue;
            }
            if let Err(e) = self.database.execute(sql).await {
                warn!(id = %action.id, sql = %sql, error = %e, "Statement failed");
                last_error = Some(e.to_string());
            }
        }

        if let Some(done) = cancelled_at {
            if done > 0 && !self.dry_run {
                action.record_outcome(Some(format!(
                    "cancelled after {done} of {total} statements"
                )));
            }
            return Outcome::Cancelled;
        }
        if self.dry_run {
            return Outcome::DryRun;
        }
        action.record_outcome(last_error);
        if action.executed {
            Outcome::Executed
        } else {
            Outcome::Failed
        }
    }
}
