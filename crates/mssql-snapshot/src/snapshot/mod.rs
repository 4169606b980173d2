//! Snapshot document: the self-contained export of one database.
//!
//! The document is serialized as JSON with snake_case field names. Every
//! collection defaults to empty so documents written by producers that omit
//! optional sections still load.

pub mod ddl;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::codec::EncodedValue;

/// Format version written into every snapshot.
pub const FORMAT_VERSION: &str = "1.0-SQLSERVER";

/// One data row: column name to encoded cell.
pub type Row = BTreeMap<String, EncodedValue>;

/// The complete exported representation of one database.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub metadata: Metadata,

    /// User schemas keyed by name.
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaInfo>,

    /// Table structures keyed by `schema.table`.
    #[serde(default)]
    pub tables: BTreeMap<String, TableInfo>,

    /// Table rows keyed by `schema.table`.
    #[serde(default)]
    pub data: BTreeMap<String, Vec<Row>>,

    #[serde(default)]
    pub stored_procedures: BTreeMap<String, String>,

    #[serde(default)]
    pub functions: BTreeMap<String, String>,

    #[serde(default)]
    pub views: BTreeMap<String, String>,

    #[serde(default)]
    pub triggers: BTreeMap<String, String>,

    /// Non-primary-key indexes keyed by `schema.table.index`.
    #[serde(default)]
    pub indexes: BTreeMap<String, String>,

    /// Check constraints keyed by `schema.table.constraint`.
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,

    /// Dependency-resolved load order of `schema.table` names.
    #[serde(default)]
    pub table_order: Vec<String>,
}

impl Snapshot {
    /// Start a new snapshot stamped with the current local time.
    pub fn new() -> Self {
        Self {
            metadata: Metadata::new(),
            ..Default::default()
        }
    }

    /// Definitions captured for one kind of procedural object.
    pub fn procedural(&self, kind: ProceduralKind) -> &BTreeMap<String, String> {
        match kind {
            ProceduralKind::Procedure => &self.stored_procedures,
            ProceduralKind::Function => &self.functions,
            ProceduralKind::View => &self.views,
            ProceduralKind::Trigger => &self.triggers,
            ProceduralKind::Index => &self.indexes,
            ProceduralKind::CheckConstraint => &self.constraints,
        }
    }

    pub fn procedural_mut(&mut self, kind: ProceduralKind) -> &mut BTreeMap<String, String> {
        match kind {
            ProceduralKind::Procedure => &mut self.stored_procedures,
            ProceduralKind::Function => &mut self.functions,
            ProceduralKind::View => &mut self.views,
            ProceduralKind::Trigger => &mut self.triggers,
            ProceduralKind::Index => &mut self.indexes,
            ProceduralKind::CheckConstraint => &mut self.constraints,
        }
    }

    /// Tables in replay order: `table_order` first, then any table the
    /// order does not mention, in name order.
    pub fn ordered_tables(&self) -> Vec<&str> {
        let mut ordered: Vec<&str> = self
            .table_order
            .iter()
            .map(String::as_str)
            .filter(|name| self.tables.contains_key(*name))
            .collect();
        for name in self.tables.keys() {
            if !ordered.contains(&name.as_str()) {
                ordered.push(name);
            }
        }
        ordered
    }

    /// Sum of captured rows across all tables.
    pub fn total_rows(&self) -> u64 {
        self.data.values().map(|rows| rows.len() as u64).sum()
    }
}

/// Provenance of a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub export_date: NaiveDateTime,
    #[serde(default)]
    pub sql_server_version: String,
    #[serde(default)]
    pub database_name: String,
    #[serde(default)]
    pub collation: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub total_tables: usize,
    #[serde(default)]
    pub total_records: u64,
}

impl Metadata {
    pub fn new() -> Self {
        Self {
            export_date: Local::now().naive_local(),
            sql_server_version: String::new(),
            database_name: String::new(),
            collation: String::new(),
            version: FORMAT_VERSION.to_string(),
            total_tables: 0,
            total_records: 0,
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            export_date: NaiveDateTime::default(),
            sql_server_version: String::new(),
            database_name: String::new(),
            collation: String::new(),
            version: String::new(),
            total_tables: 0,
            total_records: 0,
        }
    }
}

/// A user namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub schema_name: String,
    #[serde(default)]
    pub owner: String,
}

/// One table's captured structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema_name: String,
    pub table_name: String,
    /// CREATE TABLE statement generated at export time, replayed verbatim.
    #[serde(default)]
    pub create_statement: String,
    #[serde(default)]
    pub columns: Vec<ColumnInfo>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyInfo>,
    #[serde(default)]
    pub row_count: i64,
}

impl TableInfo {
    /// Fully-qualified `schema.table` name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }

    pub fn has_identity(&self) -> bool {
        self.columns.iter().any(|c| c.is_identity)
    }

    /// Columns that receive values on insert. Row-version columns are
    /// generated by the server and cannot be written.
    pub fn insertable_columns(&self) -> Vec<&ColumnInfo> {
        self.columns.iter().filter(|c| !c.is_row_version()).collect()
    }
}

/// One captured column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    /// Length in characters or bytes; -1 for `(MAX)`.
    #[serde(default)]
    pub max_length: i32,
    #[serde(default)]
    pub precision: i32,
    #[serde(default)]
    pub scale: i32,
    #[serde(default = "default_true")]
    pub is_nullable: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_identity: bool,
    #[serde(default)]
    pub identity_seed: Option<i64>,
    #[serde(default)]
    pub identity_increment: Option<i64>,
}

impl ColumnInfo {
    pub fn is_row_version(&self) -> bool {
        matches!(
            self.data_type.to_lowercase().as_str(),
            "timestamp" | "rowversion"
        )
    }
}

/// One foreign-key column pair. Composite keys appear as several entries
/// sharing a constraint name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub constraint_name: String,
    pub column_name: String,
    pub referenced_schema: String,
    pub referenced_table: String,
    pub referenced_column: String,
    #[serde(default = "default_rule")]
    pub delete_rule: String,
    #[serde(default = "default_rule")]
    pub update_rule: String,
}

impl ForeignKeyInfo {
    /// Fully-qualified name of the referenced table.
    pub fn referenced_full_name(&self) -> String {
        format!("{}.{}", self.referenced_schema, self.referenced_table)
    }
}

/// Kinds of object captured as opaque definition text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProceduralKind {
    Procedure,
    Function,
    View,
    Trigger,
    Index,
    CheckConstraint,
}

impl ProceduralKind {
    /// All kinds, in export order.
    pub const ALL: [ProceduralKind; 6] = [
        ProceduralKind::Procedure,
        ProceduralKind::Function,
        ProceduralKind::View,
        ProceduralKind::Trigger,
        ProceduralKind::Index,
        ProceduralKind::CheckConstraint,
    ];
}

impl fmt::Display for ProceduralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProceduralKind::Procedure => "stored procedure",
            ProceduralKind::Function => "function",
            ProceduralKind::View => "view",
            ProceduralKind::Trigger => "trigger",
            ProceduralKind::Index => "index",
            ProceduralKind::CheckConstraint => "check constraint",
        };
        f.write_str(name)
    }
}

fn default_true() -> bool {
    true
}

fn default_rule() -> String {
    "NO_ACTION".to_string()
}
