//! # mssql-snapshot
//!
//! Logical export and import of SQL Server databases.
//!
//! An export reads a database's schemas, tables, rows and procedural objects
//! over a single connection and writes them to one gzip-compressed JSON
//! snapshot. An import replays a snapshot into another database inside one
//! transaction:
//!
//! - **Dependency ordering**: tables are created and loaded so that
//!   foreign-key targets come before the tables that reference them
//! - **Typed values**: binary, temporal and large-text cells are tagged in
//!   the document and restored to their native types on import
//! - **Atomic import**: schema, table and data failures roll everything back;
//!   failures creating dependent objects are reported and skipped
//! - **Offline verify**: archives can be inspected without a database
//!
//! ## Example
//!
//! ```rust,no_run
//! use mssql_snapshot::{ConnectionConfig, ExportOrchestrator, MssqlConnection};
//!
//! #[tokio::main]
//! async fn main() -> mssql_snapshot::Result<()> {
//!     let config = ConnectionConfig::load("source.yaml")?;
//!     let mut connection = MssqlConnection::connect(&config).await?;
//!     let summary = ExportOrchestrator::new(&mut connection)
//!         .run("backup.gz".as_ref())
//!         .await?;
//!     println!("Exported {} rows", summary.total_records);
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod codec;
pub mod config;
pub mod core;
pub mod dependency;
pub mod drivers;
pub mod error;
pub mod export;
pub mod import;
pub mod snapshot;
pub mod verify;

#[cfg(test)]
mod testing;

// Re-exports for convenient access
pub use config::ConnectionConfig;
pub use crate::core::{CatalogReader, ReplayTarget, SqlValue};
pub use drivers::MssqlConnection;
pub use error::{MigrateError, Result};
pub use export::{ExportOrchestrator, ExportSummary};
pub use import::{ImportOrchestrator, ImportReport, ReplayWarning};
pub use snapshot::Snapshot;
pub use verify::{verify_archive, VerifyReport};
