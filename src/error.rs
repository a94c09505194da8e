//! Error types for sleet using snafu.
//!
//! The taxonomy mirrors where failures can surface: configuration load,
//! the warehouse connection, and statement execution tagged with the
//! pipeline phase that issued the statement. Nothing is caught or retried;
//! every failure aborts the run and propagates to the operator verbatim.

use snafu::prelude::*;
use std::fmt;

// ============ Config Errors ============

/// Errors that can occur while loading and validating the configuration.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variables not set: {missing}"))]
    EnvInterpolation { missing: String },

    /// Failed to parse INI configuration.
    #[snafu(display("Failed to parse INI configuration"))]
    IniParse { source: ini::ParseError },

    /// A required section is absent.
    #[snafu(display("Missing configuration section [{section}]"))]
    MissingSection { section: String },

    /// A required key is absent from its section.
    #[snafu(display("Missing configuration key {key} in section [{section}]"))]
    MissingKey { section: String, key: String },

    /// The IAM role ARN does not look like an IAM role ARN.
    #[snafu(display("Invalid IAM role ARN: {arn}"))]
    InvalidArn { arn: String },

    /// The cluster port is not a valid port number.
    #[snafu(display("Invalid DB_PORT value: {value}"))]
    InvalidPort {
        value: String,
        source: std::num::ParseIntError,
    },
}

// ============ Runner Errors ============

/// Errors surfaced by a statement runner.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RunnerError {
    /// Failed to establish the warehouse connection.
    #[snafu(display("Failed to connect to the warehouse"))]
    Connect { source: tokio_postgres::Error },

    /// The engine rejected or failed a statement.
    #[snafu(display("Statement execution failed"))]
    Execute { source: tokio_postgres::Error },

    /// A non-engine runner refused the statement.
    #[snafu(display("Statement rejected: {message}"))]
    Rejected { message: String },
}

// ============ ETL Error (top-level) ============

/// Pipeline phase that issued a failing statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Drop,
    Create,
    Copy,
    Insert,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Drop => "drop",
            Phase::Create => "create",
            Phase::Copy => "copy",
            Phase::Insert => "insert",
        };
        write!(f, "{name}")
    }
}

/// Top-level errors for an ETL run.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EtlError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Connection error.
    #[snafu(display("Connection error"))]
    Connection { source: RunnerError },

    /// A statement failed; the run stops here.
    #[snafu(display("{phase} statement for {table} failed"))]
    Statement {
        phase: Phase,
        table: String,
        source: RunnerError,
    },
}
