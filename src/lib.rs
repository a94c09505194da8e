//! sleet: full-refresh loader for a song-play star schema warehouse.
//!
//! This library owns the warehouse DDL/DML — seven tables, two bulk-load
//! statements, five transform inserts — and a thin sequential driver that
//! executes the four statement lists in order over a single connection.
//! Every run is a complete rebuild from the staged JSON sources; there is
//! no incremental or upsert path.
//!
//! # Example
//!
//! ```ignore
//! use sleet::{Config, QuerySet, error::EtlError, pipeline, warehouse::PgRunner};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), EtlError> {
//!     let config = Config::from_file("dwh.cfg")?;
//!     let queries = QuerySet::new(&config);
//!     let mut runner = PgRunner::connect(&config.connection_string()).await?;
//!     let stats = pipeline::run_etl(&mut runner, &queries).await?;
//!     println!("Inserted {} rows", stats.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod queries;
pub mod warehouse;

// Re-export main types
pub use config::Config;
pub use pipeline::{EtlStats, run_etl};
pub use queries::QuerySet;
