//! Warehouse connection and the statement-runner seam.
//!
//! The pipeline only ever needs "execute this statement, tell me how many
//! rows it touched, or fail". That seam is the [`StatementRunner`] trait;
//! [`PgRunner`] is the production implementation over a single
//! tokio-postgres connection held for the duration of the run.

use async_trait::async_trait;
use snafu::prelude::*;
use tokio_postgres::{Client, NoTls};
use tracing::warn;

use crate::error::{ConnectSnafu, ExecuteSnafu, RunnerError};

/// Executes SQL statements one at a time against the warehouse.
///
/// Implementations must surface engine errors verbatim; retrying or
/// swallowing a failure here would break the run's abort-on-first-error
/// contract.
#[async_trait]
pub trait StatementRunner: Send {
    /// Execute a single statement, returning the number of rows affected.
    async fn run(&mut self, sql: &str) -> Result<u64, RunnerError>;
}

/// Statement runner over a single warehouse connection.
pub struct PgRunner {
    client: Client,
}

impl PgRunner {
    /// Connect to the warehouse. The connection task runs in the background
    /// until the client is dropped.
    pub async fn connect(dsn: &str) -> Result<Self, RunnerError> {
        let (client, connection) = tokio_postgres::connect(dsn, NoTls).await.context(ConnectSnafu)?;

        tokio::spawn(async move {
            if let Err(source) = connection.await {
                warn!("warehouse connection ended with error: {source}");
            }
        });

        Ok(Self { client })
    }

    /// Direct access to the underlying client, for callers that need to
    /// query rather than just execute (integration tests, ad-hoc checks).
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl StatementRunner for PgRunner {
    async fn run(&mut self, sql: &str) -> Result<u64, RunnerError> {
        self.client.execute(sql, &[]).await.context(ExecuteSnafu)
    }
}
