//! Diff engine.
//!
//! Compares the declared target tables with the tables read from a live
//! database and produces the ordered list of [`UpdateAction`]s that brings
//! the database in line with the target.
//!
//! Ordering:
//!
//! 1. Per target table: create it (or rename it), otherwise drop obsolete
//!    keys and foreign keys, sync columns, keys and the primary key.
//! 2. Foreign keys of all tables, once every table exists.
//! 3. Drop tables that are no longer declared, if enabled.

use tracing::{debug, info, warn};

use crate::action::{ActionKind, UpdateAction};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::schema::{names_equal, Column, Table};

/// Options for the diff engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffOptions {
    /// Whether tables missing from the target are dropped.
    pub drop_tables: bool,
}

impl DiffOptions {
    /// Creates default options: tables are never dropped.
    #[must_use]
    pub const fn new() -> Self {
        Self { drop_tables: false }
    }

    /// Enables dropping of undeclared tables.
    #[must_use]
    pub const fn with_table_drops(mut self) -> Self {
        self.drop_tables = true;
        self
    }
}

/// Computes schema update actions for one dialect.
pub struct SchemaDiff<'a> {
    dialect: &'a dyn Dialect,
    options: DiffOptions,
}

impl<'a> SchemaDiff<'a> {
    /// Creates a diff engine with default options.
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            dialect,
            options: DiffOptions::new(),
        }
    }

    /// Creates a diff engine with custom options.
    #[must_use]
    pub fn with_options(dialect: &'a dyn Dialect, options: DiffOptions) -> Self {
        Self { dialect, options }
    }

    /// Compares `targets` with `currents` and returns the ordered actions.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::error::SchemaError::UnsupportedType`] when a
    /// declared column cannot be expressed by the dialect.
    pub fn reconcile(&self, targets: &[Table], currents: &[Table]) -> Result<Vec<UpdateAction>> {
        let targets: Vec<Table> = targets.iter().map(|t| self.normalize_keys(t)).collect();
        let mut plan = Plan::new(self.dialect.name());
        let mut renamed: Vec<&str> = Vec::new();
        let mut resolved: Vec<Option<Table>> = Vec::with_capacity(targets.len());

        for target in &targets {
            if let Some(current) = self.find_table(currents, &target.name) {
                self.sync_table(target, current, &mut plan)?;
                resolved.push(Some(current.clone()));
            } else if let Some(current) = self.rename_source(target, currents) {
                plan.push(UpdateAction::new(
                    ActionKind::RenameTable,
                    &target.name,
                    format!(
                        "table {} needs to be renamed (old name: {})",
                        target.name, current.name
                    ),
                    self.dialect.rename_table(&current.name, target),
                    true,
                ));
                renamed.push(&current.name);
                let current = Table {
                    name: target.name.clone(),
                    old_name: None,
                    ..current.clone()
                };
                self.sync_table(target, &current, &mut plan)?;
                resolved.push(Some(current));
            } else {
                plan.push(UpdateAction::new(
                    ActionKind::CreateTable,
                    &target.name,
                    format!("table {} does not exist", target.name),
                    self.dialect.create_table(target)?,
                    false,
                ));
                resolved.push(None);
            }
        }

        // Foreign keys go last so every referenced table exists.
        for (target, current) in targets.iter().zip(&resolved) {
            if current.is_none() && self.dialect.creates_foreign_keys_inline() {
                continue;
            }
            self.sync_foreign_keys(target, current.as_ref(), &mut plan);
        }

        if self.options.drop_tables {
            for current in currents {
                let declared = targets
                    .iter()
                    .any(|t| self.dialect.table_names_equal(&t.name, &current.name));
                let consumed = renamed
                    .iter()
                    .any(|r| self.dialect.table_names_equal(r, &current.name));
                if !declared && !consumed {
                    plan.push(UpdateAction::new(
                        ActionKind::DropTable,
                        &current.name,
                        format!("table {} is unused", current.name),
                        self.dialect.drop_table(current),
                        true,
                    ));
                }
            }
        }

        let actions = plan.finish();
        info!(
            dialect = self.dialect.name(),
            actions = actions.len(),
            data_loss = actions.iter().filter(|a| a.data_loss_possible).count(),
            "Computed schema changes"
        );
        Ok(actions)
    }

    /// Rewrites key names of a target table into the form the database uses.
    fn normalize_keys(&self, table: &Table) -> Table {
        let names: Vec<String> = table
            .keys
            .iter()
            .map(|k| self.dialect.effective_key_name(table, k))
            .collect();
        let mut table = table.clone();
        for (key, name) in table.keys.iter_mut().zip(names) {
            key.name = name;
        }
        table
    }

    fn find_table<'t>(&self, tables: &'t [Table], name: &str) -> Option<&'t Table> {
        tables
            .iter()
            .find(|t| self.dialect.table_names_equal(&t.name, name))
    }

    fn rename_source<'t>(&self, target: &Table, currents: &'t [Table]) -> Option<&'t Table> {
        target
            .old_name
            .as_deref()
            .and_then(|old| self.find_table(currents, old))
    }

    fn sync_table(&self, target: &Table, current: &Table, plan: &mut Plan) -> Result<()> {
        for key in &current.keys {
            let declared = target.find_key(&key.name).is_some();
            let shadows_foreign_key = target.find_foreign_key(&key.name).is_some();
            if !declared
                && !shadows_foreign_key
                && self.dialect.should_drop_key(target, current, key)
            {
                plan.push(UpdateAction::new(
                    ActionKind::DropKey,
                    &target.name,
                    format!("key {} of table {} is unused", key.name, target.name),
                    self.dialect.drop_key(target, key),
                    true,
                ));
            }
        }

        for foreign_key in &current.foreign_keys {
            if target.find_foreign_key(&foreign_key.name).is_none() {
                plan.push(UpdateAction::new(
                    ActionKind::DropForeignKey,
                    &target.name,
                    format!(
                        "foreign key {} of table {} is unused",
                        foreign_key.name, target.name
                    ),
                    self.dialect.drop_foreign_key(target, foreign_key),
                    true,
                ));
            }
        }

        self.sync_columns(target, current, plan)?;

        for key in &target.keys {
            match current.find_key(&key.name) {
                None => plan.push(UpdateAction::new(
                    ActionKind::AddKey,
                    &target.name,
                    format!("key {} of table {} does not exist", key.name, target.name),
                    self.dialect.add_key(target, key),
                    false,
                )),
                Some(existing) if !key.same_structure(existing) => {
                    plan.push(UpdateAction::new(
                        ActionKind::AlterKey,
                        &target.name,
                        format!(
                            "key {} of table {} needs to be changed",
                            key.name, target.name
                        ),
                        self.dialect.alter_key(target, existing, key),
                        true,
                    ));
                }
                Some(_) => {}
            }
        }

        if !names_equal(&target.primary_key, &current.primary_key) {
            plan.push(UpdateAction::new(
                ActionKind::AlterPrimaryKey,
                &target.name,
                format!(
                    "primary key of table {} needs to be changed (target: [{}], current: [{}])",
                    target.name,
                    target.primary_key.join(", "),
                    current.primary_key.join(", ")
                ),
                self.dialect.alter_primary_key(target, current),
                true,
            ));
        }

        Ok(())
    }

    fn sync_columns(&self, target: &Table, current: &Table, plan: &mut Plan) -> Result<()> {
        let case_sensitive = self.dialect.is_column_case_sensitive();
        let mut used = vec![false; current.columns.len()];

        for column in &target.columns {
            let found = self.find_column(current, &column.name).or_else(|| {
                column
                    .old_name
                    .as_deref()
                    .and_then(|old| self.find_column(current, old))
            });
            let Some(index) = found else {
                plan.push(UpdateAction::new(
                    ActionKind::AddColumn,
                    &target.name,
                    format!(
                        "column {} of table {} does not exist",
                        column.name, target.name
                    ),
                    self.dialect.add_column(target, column)?,
                    false,
                ));
                continue;
            };
            used[index] = true;

            let existing = &current.columns[index];
            let needs_rename = if case_sensitive {
                existing.name != column.name
            } else {
                !existing.name.eq_ignore_ascii_case(&column.name)
            };
            let old_name = needs_rename.then_some(existing.name.as_str());

            let reason = match self.dialect.are_columns_equal(column, existing) {
                Some(difference) => format!(
                    "column {} of table {} needs to be changed: {difference}",
                    column.name, target.name
                ),
                None if needs_rename => format!(
                    "column {} of table {} needs to be renamed (old name: {})",
                    column.name, target.name, existing.name
                ),
                None => continue,
            };
            plan.push(UpdateAction::new(
                ActionKind::AlterColumn,
                &target.name,
                reason,
                self.dialect.alter_column_to(target, old_name, column)?,
                true,
            ));
        }

        for (column, used) in current.columns.iter().zip(used) {
            if !used {
                plan.push(UpdateAction::new(
                    ActionKind::DropColumn,
                    &target.name,
                    format!("column {} of table {} is unused", column.name, target.name),
                    self.dialect.drop_column(target, column),
                    true,
                ));
            }
        }

        Ok(())
    }

    fn find_column(&self, table: &Table, name: &str) -> Option<usize> {
        let name = self.dialect.translate_column_name(name);
        let case_sensitive = self.dialect.is_column_case_sensitive();
        table.columns.iter().position(|c: &Column| {
            if case_sensitive {
                c.name == name
            } else {
                c.name.eq_ignore_ascii_case(&name)
            }
        })
    }

    fn sync_foreign_keys(&self, target: &Table, current: Option<&Table>, plan: &mut Plan) {
        for foreign_key in &target.foreign_keys {
            match current.and_then(|c| c.find_foreign_key(&foreign_key.name)) {
                None => plan.push(UpdateAction::new(
                    ActionKind::AddForeignKey,
                    &target.name,
                    format!(
                        "foreign key {} of table {} does not exist",
                        foreign_key.name, target.name
                    ),
                    self.dialect.add_foreign_key(target, foreign_key),
                    false,
                )),
                Some(existing) if !foreign_key.same_structure(existing) => {
                    plan.push(UpdateAction::new(
                        ActionKind::AlterForeignKey,
                        &target.name,
                        format!(
                            "foreign key {} of table {} needs to be changed",
                            foreign_key.name, target.name
                        ),
                        self.dialect.alter_foreign_key(target, existing, foreign_key),
                        true,
                    ));
                }
                Some(_) => {}
            }
        }
    }
}

/// Collects actions, skipping those the dialect cannot express.
struct Plan {
    dialect: &'static str,
    actions: Vec<UpdateAction>,
}

impl Plan {
    const fn new(dialect: &'static str) -> Self {
        Self {
            dialect,
            actions: Vec::new(),
        }
    }

    fn push(&mut self, action: UpdateAction) {
        if action.statements.is_empty() {
            warn!(
                dialect = self.dialect,
                table = %action.table,
                reason = %action.reason,
                "Change cannot be expressed, skipping"
            );
            return;
        }
        debug!(
            kind = ?action.kind,
            table = %action.table,
            data_loss = action.data_loss_possible,
            reason = %action.reason,
            "Planned schema change"
        );
        self.actions.push(action);
    }

    fn finish(self) -> Vec<UpdateAction> {
        self.actions
    }
}

/// Compares `targets` with `currents` using `dialect`.
///
/// Convenience wrapper around [`SchemaDiff::reconcile`].
///
/// # Errors
///
/// Fails when a declared column type cannot be expressed by the dialect.
pub fn reconcile(
    dialect: &dyn Dialect,
    targets: &[Table],
    currents: &[Table],
    allow_table_drops: bool,
) -> Result<Vec<UpdateAction>> {
    let options = DiffOptions {
        drop_tables: allow_table_drops,
    };
    SchemaDiff::with_options(dialect, options).reconcile(targets, currents)
}
