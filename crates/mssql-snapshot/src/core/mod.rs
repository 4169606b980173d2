//! Core abstractions shared by the orchestrators and the SQL Server driver.
//!
//! - [`value`]: native SQL value representation
//! - [`traits`]: catalog reader and replay target seams
//! - [`identifier`]: identifier validation and quoting

pub mod identifier;
pub mod traits;
pub mod value;

pub use traits::{CatalogReader, DatabaseIdentity, ReplayTarget, RowSink};
pub use value::{SqlNullType, SqlValue};
