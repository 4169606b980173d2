//! Connection-level traits the orchestrators are written against.
//!
//! - [`CatalogReader`]: reads structure, rows and procedural definitions from
//!   a source database
//! - [`ReplayTarget`]: replays statements and rows into a destination inside
//!   one transaction
//!
//! Both take `&mut self`: an implementation owns exactly one connection and
//! every call completes before the next is issued.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::snapshot::{ColumnInfo, ForeignKeyInfo, ProceduralKind, SchemaInfo};

use super::value::SqlValue;

/// Name and collation of the connected database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseIdentity {
    pub name: String,
    pub collation: String,
}

/// Receives one row at a time, values aligned with the requested columns.
pub type RowSink<'a> = dyn FnMut(Vec<SqlValue>) -> Result<()> + Send + 'a;

/// Reads catalog metadata and row data from a source database.
#[async_trait]
pub trait CatalogReader: Send {
    /// Server version banner.
    async fn server_version(&mut self) -> Result<String>;

    async fn database_identity(&mut self) -> Result<DatabaseIdentity>;

    /// User schemas, excluding system and fixed-role schemas.
    async fn list_user_schemas(&mut self) -> Result<Vec<SchemaInfo>>;

    /// User tables as `schema.table`, excluding shipped objects.
    async fn list_user_tables(&mut self) -> Result<Vec<String>>;

    /// Foreign-key edges `(dependent, referenced)` among `tables`.
    async fn list_foreign_key_edges(&mut self, tables: &[String]) -> Result<Vec<(String, String)>>;

    /// Columns in ordinal order.
    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Primary-key columns in key order; empty if the table has none.
    async fn primary_key(&mut self, schema: &str, table: &str) -> Result<Vec<String>>;

    async fn foreign_keys(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKeyInfo>>;

    async fn row_count(&mut self, table: &str) -> Result<i64>;

    /// Stream every row of `table`, reading `columns` in the given order.
    ///
    /// Returns the number of rows delivered to `sink`. An error from `sink`
    /// stops the stream and is returned as-is.
    async fn stream_rows(
        &mut self,
        table: &str,
        columns: &[ColumnInfo],
        sink: &mut RowSink<'_>,
    ) -> Result<u64>;

    /// `(qualified name, definition text)` pairs for one kind of object.
    async fn list_procedural_objects(&mut self, kind: ProceduralKind) -> Result<Vec<(String, String)>>;
}

/// Replays a snapshot into a destination database.
#[async_trait]
pub trait ReplayTarget: Send {
    async fn begin(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Execute one statement verbatim.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Create a schema unless it already exists.
    async fn create_schema(&mut self, name: &str) -> Result<()>;

    /// Number of user tables already present.
    async fn count_user_tables(&mut self) -> Result<i64>;

    /// Declared type of each column of `table` as the destination reports it.
    async fn column_types(&mut self, table: &str) -> Result<HashMap<String, String>>;

    /// Toggle explicit identity values for `table` (`schema.table`).
    async fn set_identity_insert(&mut self, table: &str, enabled: bool) -> Result<()>;

    /// Insert `rows` into `table`; each row is aligned with `columns`.
    async fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64>;
}
