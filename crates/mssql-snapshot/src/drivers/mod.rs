//! Database driver implementations.
//!
//! - [`mssql`]: Microsoft SQL Server, used both as export source and as
//!   import destination

pub mod mssql;

pub use mssql::MssqlConnection;
