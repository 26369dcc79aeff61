//! schema-sync CLI
//!
//! Command-line tool for reconciling a live database with a declared schema.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use schema_sync::prelude::*;

/// Reconcile a MySQL or SQLite schema with a declared target schema.
#[derive(Parser)]
#[command(name = "schema-sync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (`mysql://...` or `sqlite:...`).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Database engine (derived from the URL if not specified).
    #[arg(long)]
    engine: Option<Engine>,

    /// Storage engine for tables created on MySQL.
    #[arg(long, default_value = "InnoDB")]
    mysql_engine: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the actions needed to reach the target schema.
    Plan {
        /// Target schema file (JSON).
        #[arg(short, long)]
        target: PathBuf,

        /// Also drop tables missing from the target.
        #[arg(long)]
        drop_tables: bool,

        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Reconcile the database with the target schema.
    Apply {
        /// Target schema file (JSON).
        #[arg(short, long)]
        target: PathBuf,

        /// Also drop tables missing from the target.
        #[arg(long)]
        drop_tables: bool,

        /// Run actions that may lose data (drops, alters, renames).
        #[arg(long)]
        allow_data_loss: bool,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the current schema of the database.
    Inspect {
        /// Print the schema as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = SyncConfig::new(cli.database);
    config.engine = cli.engine;
    config.mysql_table_engine = Some(cli.mysql_engine);

    match cli.command {
        Commands::Plan {
            target,
            drop_tables,
            json,
        } => {
            config.drop_tables = drop_tables;
            let targets = load_target_schema(&target)?;
            let sync = SchemaSync::connect(config).await?;
            let actions = sync.plan(&targets).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&actions)?);
            } else if actions.is_empty() {
                info!("Schema is up to date.");
            } else {
                print_actions(&actions);
            }
        }

        Commands::Apply {
            target,
            drop_tables,
            allow_data_loss,
            dry_run,
        } => {
            config.drop_tables = drop_tables;
            config.policy = ExecutionPolicy::from_allow_data_loss(allow_data_loss);
            config.dry_run = dry_run;
            let targets = load_target_schema(&target)?;
            let sync = SchemaSync::connect(config).await?;

            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }

            let cancel_token = CancellationToken::new();
            let token_int = cancel_token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, stopping after the current statement...");
                    token_int.cancel();
                }
            });

            let (actions, summary) = sync.apply(&targets, cancel_token).await?;

            for action in actions.iter().filter(|a| a.is_failed()) {
                eprintln!("{action}");
            }
            if summary.skipped > 0 {
                println!("Skipped (may lose data, use --allow-data-loss):");
                for action in actions
                    .iter()
                    .filter(|a| a.data_loss_possible && !a.executed && a.error.is_none())
                {
                    println!("  {}", action.reason);
                }
            }
            if summary.failed > 0 {
                anyhow::bail!("{} schema change actions failed", summary.failed);
            }
            if summary.cancelled {
                anyhow::bail!("execution cancelled");
            }
        }

        Commands::Inspect { json } => {
            let sync = SchemaSync::connect(config).await?;
            let schema = sync.inspect().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&schema.tables)?);
            } else {
                print_tables(sync.dialect(), &schema.tables)?;
            }
            for (table, error) in &schema.unreadable {
                warn!("Could not read table {table}: {error}");
            }
        }
    }

    Ok(())
}

fn print_actions(actions: &[UpdateAction]) {
    println!("Planned actions:");
    for action in actions {
        let marker = if action.data_loss_possible { "!" } else { "+" };
        println!("[{marker}] {action}");
    }
    let data_loss = actions.iter().filter(|a| a.data_loss_possible).count();
    if data_loss > 0 {
        println!("\n{data_loss} actions marked [!] may lose data.");
    }
}

fn print_tables(dialect: &dyn Dialect, tables: &[Table]) -> anyhow::Result<()> {
    for table in tables {
        println!("{}", table.name);
        for column in &table.columns {
            let mut line = format!("  {} {}", column.name, dialect.type_name(column)?);
            if !column.nullable {
                line.push_str(" NOT NULL");
            }
            if column.auto_increment {
                line.push_str(" AUTO_INCREMENT");
            }
            if let Some(default) = &column.default_value {
                line.push_str(&format!(" DEFAULT {default}"));
            }
            println!("{line}");
        }
        if !table.primary_key.is_empty() {
            println!("  PRIMARY KEY ({})", table.primary_key.join(", "));
        }
        for key in &table.keys {
            let kind = if key.unique { "UNIQUE KEY" } else { "KEY" };
            println!("  {kind} {} ({})", key.name, key.columns.join(", "));
        }
        for fk in &table.foreign_keys {
            println!(
                "  FOREIGN KEY {} ({}) REFERENCES {} ({})",
                fk.name,
                fk.columns.join(", "),
                fk.foreign_table,
                fk.foreign_columns.join(", ")
            );
        }
    }
    Ok(())
}
