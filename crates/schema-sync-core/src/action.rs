//! Update actions produced by the diff engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of structural change an action performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Create a missing table.
    CreateTable,
    /// Rename a table according to its rename hint.
    RenameTable,
    /// Drop a table that is no longer declared.
    DropTable,
    /// Add a missing column.
    AddColumn,
    /// Change type, nullability, default or name of a column.
    AlterColumn,
    /// Drop a column that is no longer declared.
    DropColumn,
    /// Add a missing key.
    AddKey,
    /// Recreate a key with different columns or uniqueness.
    AlterKey,
    /// Drop a key that is no longer declared.
    DropKey,
    /// Replace the primary key.
    AlterPrimaryKey,
    /// Add a missing foreign key.
    AddForeignKey,
    /// Recreate a foreign key with different columns or target.
    AlterForeignKey,
    /// Drop a foreign key that is no longer declared.
    DropForeignKey,
}

/// A single, classified unit of schema change.
///
/// Created by the diff engine, then executed at most once. The execution
/// outcome is recorded on the action itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAction {
    /// Unique id, used to approve and execute a single action.
    pub id: String,
    /// What this action does.
    pub kind: ActionKind,
    /// Table this action applies to.
    pub table: String,
    /// Human readable explanation.
    pub reason: String,
    /// Statements to run, in order.
    pub statements: Vec<String>,
    /// Whether running this action may destroy data.
    pub data_loss_possible: bool,
    /// Whether the action ran without errors.
    #[serde(default)]
    pub executed: bool,
    /// Last error reported while executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the action was executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
}

impl UpdateAction {
    /// Creates a new, not yet executed action.
    #[must_use]
    pub fn new(
        kind: ActionKind,
        table: impl Into<String>,
        reason: impl Into<String>,
        statements: Vec<String>,
        data_loss_possible: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            table: table.into(),
            reason: reason.into(),
            statements,
            data_loss_possible,
            executed: false,
            error: None,
            executed_at: None,
        }
    }

    /// Whether execution was attempted and produced an error.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Records the outcome of executing this action.
    ///
    /// `error` is the last statement error, if any.
    pub fn record_outcome(&mut self, error: Option<String>) {
        self.executed = error.is_none();
        self.error = error;
        self.executed_at = Some(Utc::now());
    }
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        for sql in &self.statements {
            write!(f, "\n  {sql};")?;
        }
        if let Some(error) = &self.error {
            write!(f, "\n  ERROR: {error}")?;
        }
        Ok(())
    }
}
