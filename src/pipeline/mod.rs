//! The full-refresh pipeline: drop, create, copy, transform.
//!
//! Execution is strictly sequential over a single connection: one statement
//! at a time, each awaited to completion before the next begins. The first
//! engine error aborts the run with the failing phase and table attached;
//! there is no retry and no rollback, so a mid-sequence failure leaves the
//! warehouse partially rebuilt. That is an accepted property of the design,
//! not something this layer papers over.

use snafu::prelude::*;
use tracing::{debug, info};

use crate::error::{EtlError, Phase, StatementSnafu};
use crate::queries::{QuerySet, Statement};
use crate::warehouse::StatementRunner;

/// Statistics about a completed run.
#[derive(Debug, Clone, Default)]
pub struct EtlStats {
    pub tables_dropped: usize,
    pub tables_created: usize,
    pub staging_copies: usize,
    pub rows_inserted: u64,
}

/// Drop all seven tables, then create all seven.
///
/// Drops run to completion before the first create so no stale object can
/// survive a schema change. Dropping a missing table is fine; creating over
/// an existing one is not, and surfaces as an engine error.
pub async fn reset_schema(
    runner: &mut dyn StatementRunner,
    queries: &QuerySet,
) -> Result<(), EtlError> {
    run_list(runner, queries.drop_table_queries(), Phase::Drop).await?;
    info!("dropped {} tables", queries.drop_table_queries().len());

    run_list(runner, queries.create_table_queries(), Phase::Create).await?;
    info!("created {} tables", queries.create_table_queries().len());

    Ok(())
}

/// Bulk-load both staging tables from object storage.
///
/// The two copies are independent of each other but both must complete
/// before the transform reads staging. Returns the number of copies run.
pub async fn load_staging(
    runner: &mut dyn StatementRunner,
    queries: &QuerySet,
) -> Result<usize, EtlError> {
    for stmt in queries.copy_table_queries() {
        debug!(table = stmt.table.name(), "issuing staging copy");
        let rows = execute(runner, stmt, Phase::Copy).await?;
        info!(table = stmt.table.name(), rows, "staging copy complete");
    }
    Ok(queries.copy_table_queries().len())
}

/// Run the five transform inserts in list order.
///
/// `dim_song` is populated before `songplay` joins against it; the list is
/// built in that order and executed verbatim. Returns total rows inserted.
pub async fn transform(
    runner: &mut dyn StatementRunner,
    queries: &QuerySet,
) -> Result<u64, EtlError> {
    let mut rows_inserted = 0;
    for stmt in queries.insert_table_queries() {
        debug!(table = stmt.table.name(), "running transform insert");
        let rows = execute(runner, stmt, Phase::Insert).await?;
        info!(table = stmt.table.name(), rows, "insert complete");
        rows_inserted += rows;
    }
    Ok(rows_inserted)
}

/// Full refresh: drop, create, copy, transform.
pub async fn run_etl(
    runner: &mut dyn StatementRunner,
    queries: &QuerySet,
) -> Result<EtlStats, EtlError> {
    reset_schema(runner, queries).await?;
    let staging_copies = load_staging(runner, queries).await?;
    let rows_inserted = transform(runner, queries).await?;

    Ok(EtlStats {
        tables_dropped: queries.drop_table_queries().len(),
        tables_created: queries.create_table_queries().len(),
        staging_copies,
        rows_inserted,
    })
}

async fn run_list(
    runner: &mut dyn StatementRunner,
    statements: &[Statement],
    phase: Phase,
) -> Result<(), EtlError> {
    for stmt in statements {
        debug!(table = stmt.table.name(), %phase, "executing statement");
        execute(runner, stmt, phase).await?;
    }
    Ok(())
}

async fn execute(
    runner: &mut dyn StatementRunner,
    stmt: &Statement,
    phase: Phase,
) -> Result<u64, EtlError> {
    runner.run(&stmt.sql).await.context(StatementSnafu {
        phase,
        table: stmt.table.name(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterConfig, Config, IamRoleConfig, S3Config};
    use crate::error::RunnerError;
    use async_trait::async_trait;

    fn test_config() -> Config {
        Config {
            iam_role: IamRoleConfig {
                arn: "arn:aws:iam::123456789012:role/dwh-load".to_string(),
            },
            s3: S3Config {
                log_data: "s3://data-lake/log_data".to_string(),
                song_data: "s3://data-lake/song_data".to_string(),
                region: "us-west-2".to_string(),
            },
            cluster: ClusterConfig {
                host: "cluster.example.com".to_string(),
                db_name: "dwh".to_string(),
                db_user: "dwh_admin".to_string(),
                db_password: "secret".to_string(),
                db_port: 5439,
            },
        }
    }

    /// Records every statement it is handed; optionally fails at a fixed
    /// position to exercise the abort-on-first-error contract.
    struct RecordingRunner {
        executed: Vec<String>,
        fail_at: Option<usize>,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                executed: Vec::new(),
                fail_at: None,
            }
        }

        fn failing_at(position: usize) -> Self {
            Self {
                executed: Vec::new(),
                fail_at: Some(position),
            }
        }
    }

    #[async_trait]
    impl StatementRunner for RecordingRunner {
        async fn run(&mut self, sql: &str) -> Result<u64, RunnerError> {
            if self.fail_at == Some(self.executed.len()) {
                return Err(RunnerError::Rejected {
                    message: "injected failure".to_string(),
                });
            }
            self.executed.push(sql.to_string());
            Ok(1)
        }
    }

    fn expected_full_order(queries: &QuerySet) -> Vec<String> {
        [
            queries.drop_table_queries(),
            queries.create_table_queries(),
            queries.copy_table_queries(),
            queries.insert_table_queries(),
        ]
        .into_iter()
        .flatten()
        .map(|stmt| stmt.sql.clone())
        .collect()
    }

    #[tokio::test]
    async fn test_run_etl_executes_all_lists_in_order() {
        let queries = QuerySet::new(&test_config());
        let mut runner = RecordingRunner::new();

        let stats = run_etl(&mut runner, &queries).await.unwrap();

        assert_eq!(runner.executed, expected_full_order(&queries));
        assert_eq!(runner.executed.len(), 21);
        assert_eq!(stats.tables_dropped, 7);
        assert_eq!(stats.tables_created, 7);
        assert_eq!(stats.staging_copies, 2);
        assert_eq!(stats.rows_inserted, 5);
    }

    #[tokio::test]
    async fn test_drops_complete_before_first_create() {
        let queries = QuerySet::new(&test_config());
        let mut runner = RecordingRunner::new();

        reset_schema(&mut runner, &queries).await.unwrap();

        let first_create = runner
            .executed
            .iter()
            .position(|sql| sql.starts_with("CREATE"))
            .unwrap();
        assert_eq!(first_create, 7, "all drops must precede the first create");
        assert!(runner.executed[..7].iter().all(|sql| sql.starts_with("DROP")));
    }

    #[tokio::test]
    async fn test_failure_aborts_without_retry() {
        let queries = QuerySet::new(&test_config());
        // Fail on the 10th statement (third create).
        let mut runner = RecordingRunner::failing_at(9);

        let err = run_etl(&mut runner, &queries).await.unwrap_err();

        match err {
            EtlError::Statement { phase, table, .. } => {
                assert_eq!(phase, Phase::Create);
                assert_eq!(table, "songplay");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing after the failing statement ran, and it was not retried.
        assert_eq!(runner.executed.len(), 9);
    }

    #[tokio::test]
    async fn test_transform_failure_reports_insert_phase() {
        let queries = QuerySet::new(&test_config());
        let mut runner = RecordingRunner::failing_at(1);

        let err = transform(&mut runner, &queries).await.unwrap_err();

        match err {
            EtlError::Statement { phase, table, .. } => {
                assert_eq!(phase, Phase::Insert);
                assert_eq!(table, "dim_song");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(runner.executed.len(), 1);
    }
}
