//! sleet: full-refresh ETL driver for the song-play warehouse.
//!
//! Executes the warehouse statement lists in strict order — drop, create,
//! copy, transform — against a single connection, aborting on the first
//! engine error.

use clap::{Parser, Subcommand};
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sleet::config::Config;
use sleet::error::{ConfigSnafu, ConnectionSnafu, EtlError};
use sleet::pipeline;
use sleet::queries::QuerySet;
use sleet::warehouse::PgRunner;

/// Star-schema warehouse loader.
#[derive(Parser, Debug)]
#[command(name = "sleet")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the INI configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the statement plan without connecting to the warehouse.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drop and recreate the seven warehouse tables.
    CreateTables,
    /// Bulk-load staging from object storage, then run the transform inserts.
    Load,
    /// Full refresh: drop, create, copy, transform.
    Run,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), EtlError> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;
    let queries = QuerySet::new(&config);

    if args.dry_run {
        print_plan(&args.command, &queries);
        return Ok(());
    }

    let mut runner = PgRunner::connect(&config.connection_string())
        .await
        .context(ConnectionSnafu)?;
    info!("connected to {}", config.cluster.host);

    match args.command {
        Command::CreateTables => {
            pipeline::reset_schema(&mut runner, &queries).await?;
            info!("schema reset complete");
        }
        Command::Load => {
            let staging_copies = pipeline::load_staging(&mut runner, &queries).await?;
            let rows_inserted = pipeline::transform(&mut runner, &queries).await?;
            info!("load complete");
            info!("  Staging copies: {staging_copies}");
            info!("  Rows inserted: {rows_inserted}");
        }
        Command::Run => {
            let stats = pipeline::run_etl(&mut runner, &queries).await?;
            info!("full refresh complete");
            info!("  Tables dropped: {}", stats.tables_dropped);
            info!("  Tables created: {}", stats.tables_created);
            info!("  Staging copies: {}", stats.staging_copies);
            info!("  Rows inserted: {}", stats.rows_inserted);
        }
    }

    Ok(())
}

/// Print, in execution order, every statement the given command would run.
fn print_plan(command: &Command, queries: &QuerySet) {
    let lists = match command {
        Command::CreateTables => vec![queries.drop_table_queries(), queries.create_table_queries()],
        Command::Load => vec![queries.copy_table_queries(), queries.insert_table_queries()],
        Command::Run => vec![
            queries.drop_table_queries(),
            queries.create_table_queries(),
            queries.copy_table_queries(),
            queries.insert_table_queries(),
        ],
    };

    for stmt in lists.into_iter().flatten() {
        println!("{}\n", stmt.sql);
    }
}
