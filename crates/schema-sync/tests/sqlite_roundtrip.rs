//! Integration tests reconciling an in-memory SQLite database.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use schema_sync::prelude::*;

// ============================================================================
// Fixtures
// ============================================================================

const TARGET_SCHEMA: &str = r#"{
  "tables": [
    {
      "name": "customers",
      "columns": [
        {"name": "id", "type": "BIGINT", "auto_increment": true},
        {"name": "name", "type": "VARCHAR", "length": 100, "nullable": false}
      ],
      "primary_key": ["id"]
    },
    {
      "name": "orders",
      "columns": [
        {"name": "id", "type": "BIGINT", "auto_increment": true},
        {"name": "customer_id", "type": "BIGINT", "nullable": false},
        {"name": "status", "type": "VARCHAR", "length": 20, "nullable": false, "default_value": "open"},
        {"name": "total", "type": "DECIMAL", "precision": 10, "scale": 2}
      ],
      "primary_key": ["id"],
      "keys": [{"name": "status", "columns": ["status"]}],
      "foreign_keys": [
        {
          "name": "fk_orders_customer",
          "columns": ["customer_id"],
          "foreign_table": "customers",
          "foreign_columns": ["id"]
        }
      ]
    }
  ]
}"#;

fn target() -> Vec<Table> {
    parse_target_schema(TARGET_SCHEMA).expect("Invalid target schema fixture")
}

fn table<'a>(tables: &'a mut [Table], name: &str) -> &'a mut Table {
    tables
        .iter_mut()
        .find(|t| t.name == name)
        .expect("Missing fixture table")
}

async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

fn sync_with(pool: &SqlitePool, config: SyncConfig) -> SchemaSync {
    SchemaSync::with_database(Database::Sqlite(pool.clone()), config)
        .expect("Failed to build schema sync")
}

fn safe_sync(pool: &SqlitePool) -> SchemaSync {
    sync_with(pool, SyncConfig::new("sqlite::memory:"))
}

fn unsafe_sync(pool: &SqlitePool) -> SchemaSync {
    let mut config = SyncConfig::new("sqlite::memory:");
    config.policy = ExecutionPolicy::All;
    sync_with(pool, config)
}

async fn apply(sync: &SchemaSync, targets: &[Table]) -> (Vec<UpdateAction>, ExecutionSummary) {
    sync.apply(targets, CancellationToken::new())
        .await
        .expect("Failed to apply target schema")
}

async fn table_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

// ============================================================================
// Creation and idempotence
// ============================================================================

#[tokio::test]
async fn test_creates_missing_tables() {
    let pool = create_test_pool().await;
    let sync = safe_sync(&pool);

    let (actions, summary) = apply(&sync, &target()).await;

    assert_eq!(actions.len(), 2);
    assert!(actions.iter().all(|a| a.kind == ActionKind::CreateTable));
    assert_eq!(actions[0].reason, "table customers does not exist");
    assert_eq!(actions[1].reason, "table orders does not exist");
    assert_eq!(summary.executed, 2);
    assert_eq!(summary.failed, 0);
    assert!(actions.iter().all(|a| a.executed && a.executed_at.is_some()));
    assert_eq!(table_names(&pool).await, vec!["customers", "orders"]);
}

#[tokio::test]
async fn test_second_plan_is_empty() {
    let pool = create_test_pool().await;
    let sync = safe_sync(&pool);
    apply(&sync, &target()).await;

    let actions = sync.plan(&target()).await.unwrap();

    assert!(actions.is_empty(), "unexpected actions: {actions:?}");
}

#[tokio::test]
async fn test_introspection_recovers_declared_structure() {
    let pool = create_test_pool().await;
    let sync = safe_sync(&pool);
    apply(&sync, &target()).await;

    let schema = sync.inspect().await.unwrap();
    assert!(schema.unreadable.is_empty());
    let orders = schema.tables.iter().find(|t| t.name == "orders").unwrap();

    assert_eq!(orders.primary_key, vec!["id"]);
    assert!(orders.columns[0].auto_increment);
    assert_eq!(orders.columns[3].precision, 10);
    assert_eq!(orders.columns[3].scale, 2);
    assert_eq!(orders.keys.len(), 1);
    assert_eq!(orders.keys[0].name, "orders_status");
    assert_eq!(orders.foreign_keys.len(), 1);
    assert_eq!(orders.foreign_keys[0].name, "fk_orders_customer");
    assert_eq!(orders.foreign_keys[0].foreign_table, "customers");
}

// ============================================================================
// Incremental changes
// ============================================================================

#[tokio::test]
async fn test_new_column_is_added_safely() {
    let pool = create_test_pool().await;
    let sync = safe_sync(&pool);
    apply(&sync, &target()).await;

    let mut targets = target();
    let customers = table(&mut targets, "customers");
    customers.columns.push(Column::new("email", SqlType::Varchar).length(255));

    let (actions, summary) = apply(&sync, &targets).await;

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::AddColumn);
    assert_eq!(actions[0].reason, "column email of table customers does not exist");
    assert!(!actions[0].data_loss_possible);
    assert_eq!(summary.executed, 1);
    assert!(sync.plan(&targets).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_removed_column_requires_data_loss_permission() {
    let pool = create_test_pool().await;
    apply(&safe_sync(&pool), &target()).await;

    let mut targets = target();
    let orders = table(&mut targets, "orders");
    orders.columns.retain(|c| c.name != "total");

    let (actions, summary) = apply(&safe_sync(&pool), &targets).await;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].reason, "column total of table orders is unused");
    assert!(actions[0].data_loss_possible);
    assert!(!actions[0].executed);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.executed, 0);

    let (_, summary) = apply(&unsafe_sync(&pool), &targets).await;
    assert_eq!(summary.executed, 1);
    assert!(safe_sync(&pool).plan(&targets).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_column_rename_follows_old_name() {
    let pool = create_test_pool().await;
    apply(&safe_sync(&pool), &target()).await;

    let mut targets = target();
    let orders = table(&mut targets, "orders");
    let status = orders.columns.iter_mut().find(|c| c.name == "status").unwrap();
    status.name = "state".to_string();
    status.old_name = Some("status".to_string());
    orders.keys[0].columns = vec!["state".to_string()];

    let (actions, summary) = apply(&unsafe_sync(&pool), &targets).await;

    assert_eq!(actions[0].kind, ActionKind::AlterColumn);
    assert_eq!(
        actions[0].reason,
        "column state of table orders needs to be renamed (old name: status)"
    );
    assert_eq!(actions[1].kind, ActionKind::AlterKey);
    assert_eq!(summary.failed, 0, "failed actions: {actions:?}");
    assert!(safe_sync(&pool).plan(&targets).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_table_rename_follows_old_name() {
    let pool = create_test_pool().await;
    apply(&safe_sync(&pool), &target()).await;

    let mut targets = target();
    let orders = table(&mut targets, "orders");
    orders.name = "purchases".to_string();
    orders.old_name = Some("orders".to_string());

    let (actions, summary) = apply(&unsafe_sync(&pool), &targets).await;

    assert_eq!(actions[0].kind, ActionKind::RenameTable);
    assert_eq!(
        actions[0].reason,
        "table purchases needs to be renamed (old name: orders)"
    );
    assert_eq!(summary.failed, 0, "failed actions: {actions:?}");
    assert_eq!(table_names(&pool).await, vec!["customers", "purchases"]);
    assert!(safe_sync(&pool).plan(&targets).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undeclared_tables_are_dropped_only_when_enabled() {
    let pool = create_test_pool().await;
    apply(&safe_sync(&pool), &target()).await;
    sqlx::query("CREATE TABLE audit_log (id INTEGER)")
        .execute(&pool)
        .await
        .unwrap();

    assert!(safe_sync(&pool).plan(&target()).await.unwrap().is_empty());

    let mut config = SyncConfig::new("sqlite::memory:");
    config.drop_tables = true;
    config.policy = ExecutionPolicy::All;
    let (actions, summary) = apply(&sync_with(&pool, config), &target()).await;

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].kind, ActionKind::DropTable);
    assert_eq!(actions[0].reason, "table audit_log is unused");
    assert_eq!(summary.executed, 1);
    assert_eq!(table_names(&pool).await, vec!["customers", "orders"]);
}

// ============================================================================
// Execution control
// ============================================================================

#[tokio::test]
async fn test_failed_statement_is_recorded_and_run_continues() {
    let pool = create_test_pool().await;
    let sync = safe_sync(&pool);
    let mut actions = sync.plan(&target()).await.unwrap();
    // Collides with the table created by the first action.
    actions[1].statements.insert(0, "CREATE TABLE customers (x INTEGER)".to_string());

    let summary = sync
        .executor(CancellationToken::new())
        .execute(&mut actions)
        .await;

    assert_eq!(summary.executed, 1);
    assert_eq!(summary.failed, 1);
    assert!(actions[1].is_failed());
    assert!(actions[1].error.as_deref().unwrap().contains("already exists"));
    assert!(actions[1].executed_at.is_some());
    // Statements after the failing one still ran.
    assert_eq!(table_names(&pool).await, vec!["customers", "orders"]);
}

#[tokio::test]
async fn test_cancelled_run_leaves_actions_unexecuted() {
    let pool = create_test_pool().await;
    let sync = safe_sync(&pool);
    let cancel_token = CancellationToken::new();
    cancel_token.cancel();

    let (actions, summary) = sync.apply(&target(), cancel_token).await.unwrap();

    assert!(summary.cancelled);
    assert!(actions.iter().all(|a| !a.executed && a.executed_at.is_none()));
    assert!(table_names(&pool).await.is_empty());
}

#[tokio::test]
async fn test_dry_run_changes_nothing() {
    let pool = create_test_pool().await;
    let mut config = SyncConfig::new("sqlite::memory:");
    config.dry_run = true;
    let sync = sync_with(&pool, config);

    let (actions, summary) = apply(&sync, &target()).await;

    assert_eq!(actions.len(), 2);
    assert_eq!(summary.previewed, 2);
    assert_eq!(summary.executed, 0);
    assert!(actions.iter().all(|a| !a.executed));
    assert!(table_names(&pool).await.is_empty());
}

#[tokio::test]
async fn test_execute_single_action_by_id() {
    let pool = create_test_pool().await;
    let sync = safe_sync(&pool);
    let mut actions = sync.plan(&target()).await.unwrap();
    let id = actions[0].id.clone();

    let executor = sync.executor(CancellationToken::new());
    let action = executor.execute_by_id(&mut actions, &id).await.unwrap();

    assert!(action.executed);
    assert!(!actions[1].executed);
    assert_eq!(table_names(&pool).await, vec!["customers"]);
}
