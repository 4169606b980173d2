//! In-memory catalog and destination used by orchestrator tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;

use crate::core::traits::{CatalogReader, DatabaseIdentity, ReplayTarget, RowSink};
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::snapshot::{ColumnInfo, ForeignKeyInfo, ProceduralKind, SchemaInfo};

/// Nullable, non-identity column of `data_type`.
pub fn column(name: &str, data_type: &str) -> ColumnInfo {
    ColumnInfo {
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        max_length: 0,
        precision: 0,
        scale: 0,
        is_nullable: true,
        default_value: None,
        is_identity: false,
        identity_seed: None,
        identity_increment: None,
    }
}

/// Identity column with the given seed, increment 1.
pub fn identity_column(name: &str, seed: i64) -> ColumnInfo {
    ColumnInfo {
        is_nullable: false,
        is_identity: true,
        identity_seed: Some(seed),
        identity_increment: Some(1),
        ..column(name, "int")
    }
}

fn simulated(message: &str) -> MigrateError {
    MigrateError::Io(std::io::Error::new(std::io::ErrorKind::Other, message.to_string()))
}

struct MemoryTable {
    columns: Vec<ColumnInfo>,
    primary_key: Vec<String>,
    foreign_keys: Vec<ForeignKeyInfo>,
    rows: Vec<Vec<SqlValue>>,
}

/// Source database held in memory.
pub struct MemoryCatalog {
    database: String,
    schemas: Vec<SchemaInfo>,
    tables: Vec<(String, MemoryTable)>,
    procedural: Vec<(ProceduralKind, String, String)>,
    failing_table: Option<String>,
}

impl MemoryCatalog {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            schemas: Vec::new(),
            tables: Vec::new(),
            procedural: Vec::new(),
            failing_table: None,
        }
    }

    pub fn add_schema(&mut self, name: &str, owner: &str) {
        self.schemas.push(SchemaInfo {
            schema_name: name.to_string(),
            owner: owner.to_string(),
        });
    }

    pub fn add_table(&mut self, name: &str, columns: Vec<ColumnInfo>, primary_key: &[&str]) {
        self.tables.push((
            name.to_string(),
            MemoryTable {
                columns,
                primary_key: primary_key.iter().map(|c| c.to_string()).collect(),
                foreign_keys: Vec::new(),
                rows: Vec::new(),
            },
        ));
    }

    pub fn add_foreign_key(
        &mut self,
        table: &str,
        constraint: &str,
        column: &str,
        referenced: &str,
        referenced_column: &str,
    ) {
        let (referenced_schema, referenced_table) =
            crate::core::identifier::split_qualified(referenced);
        let fk = ForeignKeyInfo {
            constraint_name: constraint.to_string(),
            column_name: column.to_string(),
            referenced_schema: referenced_schema.to_string(),
            referenced_table: referenced_table.to_string(),
            referenced_column: referenced_column.to_string(),
            delete_rule: "NO_ACTION".to_string(),
            update_rule: "NO_ACTION".to_string(),
        };
        if let Some(t) = self.table_mut(table) {
            t.foreign_keys.push(fk);
        }
    }

    pub fn add_rows(&mut self, table: &str, rows: Vec<Vec<SqlValue>>) {
        if let Some(t) = self.table_mut(table) {
            t.rows.extend(rows);
        }
    }

    pub fn add_procedural(&mut self, kind: ProceduralKind, name: &str, definition: &str) {
        self.procedural
            .push((kind, name.to_string(), definition.to_string()));
    }

    /// Make row reads of `table` fail.
    pub fn fail_rows_for(&mut self, table: &str) {
        self.failing_table = Some(table.to_string());
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
            .ok_or_else(|| MigrateError::catalog(name, "no such table"))
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut MemoryTable> {
        self.tables
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

#[async_trait]
impl CatalogReader for MemoryCatalog {
    async fn server_version(&mut self) -> Result<String> {
        Ok("Microsoft SQL Server 2022 (in-memory)".to_string())
    }

    async fn database_identity(&mut self) -> Result<DatabaseIdentity> {
        Ok(DatabaseIdentity {
            name: self.database.clone(),
            collation: "SQL_Latin1_General_CP1_CI_AS".to_string(),
        })
    }

    async fn list_user_schemas(&mut self) -> Result<Vec<SchemaInfo>> {
        Ok(self.schemas.clone())
    }

    async fn list_user_tables(&mut self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|(n, _)| n.clone()).collect())
    }

    async fn list_foreign_key_edges(&mut self, tables: &[String]) -> Result<Vec<(String, String)>> {
        Ok(self
            .tables
            .iter()
            .filter(|(n, _)| tables.contains(n))
            .flat_map(|(n, t)| {
                t.foreign_keys
                    .iter()
                    .map(move |fk| (n.clone(), fk.referenced_full_name()))
            })
            .collect())
    }

    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(self.table(&format!("{}.{}", schema, table))?.columns.clone())
    }

    async fn primary_key(&mut self, schema: &str, table: &str) -> Result<Vec<String>> {
        Ok(self.table(&format!("{}.{}", schema, table))?.primary_key.clone())
    }

    async fn foreign_keys(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        Ok(self.table(&format!("{}.{}", schema, table))?.foreign_keys.clone())
    }

    async fn row_count(&mut self, table: &str) -> Result<i64> {
        Ok(self.table(table)?.rows.len() as i64)
    }

    async fn stream_rows(
        &mut self,
        table: &str,
        _columns: &[ColumnInfo],
        sink: &mut RowSink<'_>,
    ) -> Result<u64> {
        if self.failing_table.as_deref() == Some(table) {
            return Err(MigrateError::catalog(
                format!("SELECT FROM {}", table),
                "simulated read failure",
            ));
        }
        let rows = self.table(table)?.rows.clone();
        let count = rows.len() as u64;
        for row in rows {
            sink(row)?;
        }
        Ok(count)
    }

    async fn list_procedural_objects(&mut self, kind: ProceduralKind) -> Result<Vec<(String, String)>> {
        Ok(self
            .procedural
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, name, def)| (name.clone(), def.clone()))
            .collect())
    }
}

/// Destination state visible to readers.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub schemas: Vec<String>,
    pub statements: Vec<String>,
    pub rows: BTreeMap<String, Vec<Vec<SqlValue>>>,
}

/// Destination database with transactional semantics: writes made inside
/// a transaction become visible only on commit and vanish on rollback.
#[derive(Debug, Default)]
pub struct MemoryTarget {
    pub committed: MemoryState,
    staged: Option<MemoryState>,
    failures: Vec<(String, String)>,
    pub existing_user_tables: i64,
    /// Declared types reported per table; tables not listed report none.
    pub column_types: HashMap<String, HashMap<String, String>>,
    pub identity_insert: Option<String>,
    pub identity_log: Vec<(String, bool)>,
    /// Every insert call as `(table, columns, row count)`.
    pub insert_log: Vec<(String, Vec<String>, usize)>,
    pub commits: usize,
    pub rollbacks: usize,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail any operation whose statement text contains `pattern`.
    pub fn fail_when(&mut self, pattern: &str, message: &str) {
        self.failures.push((pattern.to_string(), message.to_string()));
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.committed.rows.get(table).map_or(0, Vec::len)
    }

    fn check(&self, statement: &str) -> Result<()> {
        match self.failures.iter().find(|(p, _)| statement.contains(p.as_str())) {
            Some((_, message)) => Err(simulated(message)),
            None => Ok(()),
        }
    }

    fn state(&mut self) -> &mut MemoryState {
        match self.staged.as_mut() {
            Some(staged) => staged,
            None => &mut self.committed,
        }
    }
}

#[async_trait]
impl ReplayTarget for MemoryTarget {
    async fn begin(&mut self) -> Result<()> {
        self.staged = Some(self.committed.clone());
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if let Some(staged) = self.staged.take() {
            self.committed = staged;
        }
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.staged = None;
        self.rollbacks += 1;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.check(sql)?;
        self.state().statements.push(sql.to_string());
        Ok(())
    }

    async fn create_schema(&mut self, name: &str) -> Result<()> {
        self.check(&format!("CREATE SCHEMA [{}]", name))?;
        self.state().schemas.push(name.to_string());
        Ok(())
    }

    async fn count_user_tables(&mut self) -> Result<i64> {
        Ok(self.existing_user_tables)
    }

    async fn column_types(&mut self, table: &str) -> Result<HashMap<String, String>> {
        Ok(self.column_types.get(table).cloned().unwrap_or_default())
    }

    async fn set_identity_insert(&mut self, table: &str, enabled: bool) -> Result<()> {
        self.check(&format!(
            "IDENTITY_INSERT {} {}",
            table,
            if enabled { "ON" } else { "OFF" }
        ))?;
        self.identity_log.push((table.to_string(), enabled));
        self.identity_insert = enabled.then(|| table.to_string());
        Ok(())
    }

    async fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64> {
        self.check(&format!("INSERT INTO {}", table))?;
        self.insert_log
            .push((table.to_string(), columns.to_vec(), rows.len()));
        self.state()
            .rows
            .entry(table.to_string())
            .or_default()
            .extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }
}
