//! Import orchestrator: replays a snapshot into a destination database.
//!
//! The whole replay runs inside one transaction on one connection:
//!
//! ```text
//! START -> SCHEMAS -> TABLES -> DATA -> CONSTRAINTS -> INDEXES
//!       -> PROCEDURES -> FUNCTIONS -> VIEWS -> TRIGGERS -> COMMIT
//! ```
//!
//! Schema, table and data failures are fatal and roll everything back.
//! Failures creating check constraints, foreign keys, indexes or procedural
//! objects are logged, recorded in the [`ImportReport`] and skipped.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive;
use crate::codec;
use crate::core::traits::ReplayTarget;
use crate::core::value::SqlValue;
use crate::error::{MigrateError, Result};
use crate::snapshot::ddl::{foreign_key_statement, group_foreign_keys};
use crate::snapshot::{ProceduralKind, Row, Snapshot, TableInfo};

/// Rows sent to the destination per insert call.
pub const BATCH_SIZE: usize = 1000;

/// Replay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPhase {
    Start,
    Schemas,
    Tables,
    Data,
    Constraints,
    Indexes,
    Procedures,
    Functions,
    Views,
    Triggers,
    Commit,
    Rollback,
}

impl ImportPhase {
    /// Phase that replays definitions of `kind`.
    fn for_kind(kind: ProceduralKind) -> Self {
        match kind {
            ProceduralKind::Procedure => ImportPhase::Procedures,
            ProceduralKind::Function => ImportPhase::Functions,
            ProceduralKind::View => ImportPhase::Views,
            ProceduralKind::Trigger => ImportPhase::Triggers,
            ProceduralKind::Index => ImportPhase::Indexes,
            ProceduralKind::CheckConstraint => ImportPhase::Constraints,
        }
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportPhase::Start => "start",
            ImportPhase::Schemas => "schemas",
            ImportPhase::Tables => "tables",
            ImportPhase::Data => "data",
            ImportPhase::Constraints => "constraints",
            ImportPhase::Indexes => "indexes",
            ImportPhase::Procedures => "procedures",
            ImportPhase::Functions => "functions",
            ImportPhase::Views => "views",
            ImportPhase::Triggers => "triggers",
            ImportPhase::Commit => "commit",
            ImportPhase::Rollback => "rollback",
        };
        f.write_str(name)
    }
}

/// A replay failure that was logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayWarning {
    pub phase: ImportPhase,
    pub object: String,
    pub message: String,
}

/// Outcome of a committed import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Database the snapshot was exported from.
    pub source_database: String,

    pub schemas_created: usize,
    pub tables_created: usize,
    pub rows_inserted: u64,
    pub check_constraints: usize,
    pub foreign_keys: usize,
    pub indexes: usize,
    pub procedures: usize,
    pub functions: usize,
    pub views: usize,
    pub triggers: usize,

    /// Non-fatal failures, in the order they occurred.
    pub warnings: Vec<ReplayWarning>,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl ImportReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn count_mut(&mut self, kind: ProceduralKind) -> &mut usize {
        match kind {
            ProceduralKind::Procedure => &mut self.procedures,
            ProceduralKind::Function => &mut self.functions,
            ProceduralKind::View => &mut self.views,
            ProceduralKind::Trigger => &mut self.triggers,
            ProceduralKind::Index => &mut self.indexes,
            ProceduralKind::CheckConstraint => &mut self.check_constraints,
        }
    }
}

/// Drives one import over a single destination connection.
pub struct ImportOrchestrator<'a, T: ReplayTarget + ?Sized> {
    target: &'a mut T,
    phase: ImportPhase,
    report: ImportReport,
}

impl<'a, T: ReplayTarget + ?Sized> ImportOrchestrator<'a, T> {
    pub fn new(target: &'a mut T) -> Self {
        Self {
            target,
            phase: ImportPhase::Start,
            report: ImportReport::default(),
        }
    }

    /// Current replay state.
    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    /// Read the archive at `path` completely, then replay it.
    pub async fn run_file(&mut self, path: &Path) -> Result<ImportReport> {
        info!("Reading archive {}", path.display());
        let snapshot = archive::read_snapshot(path)?;
        self.run(&snapshot).await
    }

    /// Replay `snapshot` in a single transaction.
    ///
    /// On a fatal failure the transaction is rolled back and the error is
    /// returned; nothing from this import remains in the destination.
    pub async fn run(&mut self, snapshot: &Snapshot) -> Result<ImportReport> {
        let started = Instant::now();
        self.phase = ImportPhase::Start;
        self.report = ImportReport {
            source_database: snapshot.metadata.database_name.clone(),
            ..Default::default()
        };

        let existing = self.target.count_user_tables().await?;
        if existing > 0 {
            self.warn_nonfatal(
                "destination",
                format!("database is not empty ({} user tables); continuing", existing),
            );
        }

        self.target.begin().await?;
        let outcome = match self.replay(snapshot).await {
            Ok(()) => {
                self.enter(ImportPhase::Commit);
                self.target
                    .commit()
                    .await
                    .map_err(|e| MigrateError::replay("COMMIT", e))
            }
            Err(e) => Err(e),
        };

        if let Err(e) = outcome {
            self.enter(ImportPhase::Rollback);
            warn!("Import failed, rolling back: {}", e);
            if let Err(rollback_err) = self.target.rollback().await {
                warn!("Rollback failed: {}", rollback_err);
            }
            return Err(e);
        }

        self.report.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Import complete: {} tables, {} rows, {} warnings in {:.1}s",
            self.report.tables_created,
            self.report.rows_inserted,
            self.report.warnings.len(),
            self.report.duration_seconds
        );
        Ok(std::mem::take(&mut self.report))
    }

    async fn replay(&mut self, snapshot: &Snapshot) -> Result<()> {
        let tables = snapshot.ordered_tables();

        self.enter(ImportPhase::Schemas);
        self.create_schemas(snapshot).await?;

        self.enter(ImportPhase::Tables);
        for name in &tables {
            let table = &snapshot.tables[*name];
            self.target
                .execute(&table.create_statement)
                .await
                .map_err(|e| MigrateError::replay(*name, e))?;
            self.report.tables_created += 1;
            debug!("Created table {}", name);
        }

        self.enter(ImportPhase::Data);
        for name in &tables {
            let rows = match snapshot.data.get(*name) {
                Some(rows) if !rows.is_empty() => rows,
                _ => continue,
            };
            let inserted = self.load_table(name, &snapshot.tables[*name], rows).await?;
            info!("Loaded {} ({} rows)", name, inserted);
            self.report.rows_inserted += inserted;
        }

        self.enter(ImportPhase::Constraints);
        self.replay_definitions(snapshot, ProceduralKind::CheckConstraint)
            .await;
        for name in &tables {
            self.create_foreign_keys(&snapshot.tables[*name]).await;
        }

        for kind in [
            ProceduralKind::Index,
            ProceduralKind::Procedure,
            ProceduralKind::Function,
            ProceduralKind::View,
            ProceduralKind::Trigger,
        ] {
            self.enter(ImportPhase::for_kind(kind));
            self.replay_definitions(snapshot, kind).await;
        }

        Ok(())
    }

    async fn create_schemas(&mut self, snapshot: &Snapshot) -> Result<()> {
        for schema in snapshot.schemas.values() {
            let name = schema.schema_name.as_str();
            if name == "dbo" {
                continue;
            }
            match self.target.create_schema(name).await {
                Ok(()) => {
                    self.report.schemas_created += 1;
                    debug!("Created schema {}", name);
                }
                Err(e) if e.to_string().contains("already exists") => {
                    debug!("Schema {} already exists", name);
                }
                Err(e) => return Err(MigrateError::replay(format!("schema {}", name), e)),
            }
        }
        Ok(())
    }

    /// Insert one table's rows in batches, preserving captured identity values.
    async fn load_table(&mut self, name: &str, table: &TableInfo, rows: &[Row]) -> Result<u64> {
        let columns = insert_columns(table, rows);
        let reported = self
            .target
            .column_types(name)
            .await
            .map_err(|e| MigrateError::replay(name, e))?;
        let declared = declared_types(table, &columns, &reported);

        let identity = table
            .columns
            .iter()
            .any(|c| c.is_identity && columns.contains(&c.column_name));
        if identity {
            self.target
                .set_identity_insert(name, true)
                .await
                .map_err(|e| MigrateError::replay(name, e))?;
        }

        let loaded = self.insert_batches(name, &columns, &declared, rows).await;

        if identity {
            let restored = self.target.set_identity_insert(name, false).await;
            match (&loaded, restored) {
                (Ok(_), Err(e)) => return Err(MigrateError::replay(name, e)),
                (Err(_), Err(e)) => debug!("Could not restore identity insert on {}: {}", name, e),
                (_, Ok(())) => {}
            }
        }

        loaded
    }

    async fn insert_batches(
        &mut self,
        name: &str,
        columns: &[String],
        declared: &[String],
        rows: &[Row],
    ) -> Result<u64> {
        let mut inserted = 0u64;
        for chunk in rows.chunks(BATCH_SIZE) {
            let batch: Vec<Vec<SqlValue>> = chunk
                .iter()
                .map(|row| decode_row(row, columns, declared))
                .collect();
            inserted += self
                .target
                .insert_rows(name, columns, &batch)
                .await
                .map_err(|e| MigrateError::replay(name, e))?;
        }
        Ok(inserted)
    }

    async fn create_foreign_keys(&mut self, table: &TableInfo) {
        for fk in group_foreign_keys(&table.foreign_keys) {
            let object = format!("{}.{}", table.full_name(), fk.name);
            let result = match foreign_key_statement(table, &fk) {
                Ok(sql) => self.target.execute(&sql).await,
                Err(e) => Err(e),
            };
            match result {
                Ok(()) => self.report.foreign_keys += 1,
                Err(e) => self.warn_nonfatal(&object, e.to_string()),
            }
        }
    }

    async fn replay_definitions(&mut self, snapshot: &Snapshot, kind: ProceduralKind) {
        for (name, definition) in snapshot.procedural(kind) {
            match self.target.execute(definition).await {
                Ok(()) => *self.report.count_mut(kind) += 1,
                Err(e) => self.warn_nonfatal(name, format!("{} not created: {}", kind, e)),
            }
        }
    }

    fn enter(&mut self, phase: ImportPhase) {
        self.phase = phase;
        info!("Phase: {}", phase);
    }

    fn warn_nonfatal(&mut self, object: &str, message: String) {
        warn!("{} [{}]: {}", object, self.phase, message);
        self.report.warnings.push(ReplayWarning {
            phase: self.phase,
            object: object.to_string(),
            message,
        });
    }
}

/// Columns to insert: the table's writable columns in declared order, or
/// the first row's keys when the snapshot carries no column list.
fn insert_columns(table: &TableInfo, rows: &[Row]) -> Vec<String> {
    if table.columns.is_empty() {
        return rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
    }
    table
        .insertable_columns()
        .into_iter()
        .map(|c| c.column_name.clone())
        .collect()
}

/// Declared type per insert column, preferring what the destination reports.
fn declared_types(
    table: &TableInfo,
    columns: &[String],
    reported: &HashMap<String, String>,
) -> Vec<String> {
    columns
        .iter()
        .map(|name| {
            reported
                .get(name)
                .or_else(|| {
                    table
                        .columns
                        .iter()
                        .find(|c| &c.column_name == name)
                        .map(|c| &c.data_type)
                })
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

fn decode_row(row: &Row, columns: &[String], declared: &[String]) -> Vec<SqlValue> {
    columns
        .iter()
        .zip(declared)
        .map(|(name, declared_type)| match row.get(name) {
            Some(cell) => codec::decode(cell, declared_type),
            None => codec::decode(&serde_json::Value::Null.into(), declared_type),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::export::ExportOrchestrator;
    use crate::snapshot::SchemaInfo;
    use crate::testing::{column, identity_column, MemoryCatalog, MemoryTarget};
    use chrono::NaiveDate;

    fn table(name: &str, columns: Vec<crate::snapshot::ColumnInfo>) -> TableInfo {
        let (schema, table_name) = name.split_once('.').unwrap();
        let mut info = TableInfo {
            schema_name: schema.into(),
            table_name: table_name.into(),
            columns,
            ..Default::default()
        };
        info.create_statement = crate::snapshot::ddl::create_table_statement(&info).unwrap();
        info
    }

    fn row(cells: &[(&str, SqlValue)]) -> Row {
        cells
            .iter()
            .map(|(name, value)| (name.to_string(), encode(value)))
            .collect()
    }

    async fn exported_orders() -> Snapshot {
        let mut catalog = MemoryCatalog::new("Sales");
        catalog.add_schema("dbo", "dbo");
        catalog.add_schema("audit", "dbo");
        catalog.add_table(
            "dbo.order_items",
            vec![column("id", "int"), column("order_id", "int")],
            &["id"],
        );
        catalog.add_table("dbo.orders", vec![column("id", "int")], &["id"]);
        catalog.add_foreign_key("dbo.order_items", "FK_items_orders", "order_id", "dbo.orders", "id");
        catalog.add_rows("dbo.orders", vec![vec![SqlValue::I32(1)], vec![SqlValue::I32(2)]]);
        catalog.add_rows(
            "dbo.order_items",
            vec![
                vec![SqlValue::I32(10), SqlValue::I32(1)],
                vec![SqlValue::I32(11), SqlValue::I32(2)],
            ],
        );
        catalog.add_procedural(
            ProceduralKind::CheckConstraint,
            "dbo.orders.CK_orders_id",
            "ALTER TABLE [dbo].[orders] ADD CONSTRAINT [CK_orders_id] CHECK ([id]>(0))",
        );
        catalog.add_procedural(
            ProceduralKind::View,
            "dbo.v_orders",
            "CREATE VIEW dbo.v_orders AS SELECT id FROM dbo.orders",
        );
        ExportOrchestrator::new(&mut catalog)
            .build_snapshot()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_export_then_import_loads_parents_first() {
        let snapshot = exported_orders().await;
        let mut target = MemoryTarget::new();

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();

        let tables: Vec<_> = target.insert_log.iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(tables, vec!["dbo.orders", "dbo.order_items"]);
        let statements = &target.committed.statements;
        assert!(statements[0].starts_with("CREATE TABLE [dbo].[orders]"));
        assert!(statements[1].starts_with("CREATE TABLE [dbo].[order_items]"));

        // Check constraint is replayed before the foreign key.
        let check = statements.iter().position(|s| s.contains("CHECK")).unwrap();
        let fk = statements.iter().position(|s| s.contains("FOREIGN KEY")).unwrap();
        assert!(check < fk);

        assert_eq!(target.commits, 1);
        assert_eq!(target.row_count("dbo.orders"), 2);
        assert_eq!(target.row_count("dbo.order_items"), 2);
        assert_eq!(report.source_database, "Sales");
        assert_eq!(report.rows_inserted, 4);
        assert_eq!(report.foreign_keys, 1);
        assert_eq!(report.views, 1);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_dbo_schema_is_not_created() {
        let snapshot = exported_orders().await;
        let mut target = MemoryTarget::new();

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();
        assert_eq!(target.committed.schemas, vec!["audit"]);
        assert_eq!(report.schemas_created, 1);
    }

    #[tokio::test]
    async fn test_existing_schema_is_tolerated() {
        let snapshot = exported_orders().await;
        let mut target = MemoryTarget::new();
        target.fail_when("CREATE SCHEMA [audit]", "Schema 'audit' already exists");

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();
        assert_eq!(report.schemas_created, 0);
        assert_eq!(target.commits, 1);
    }

    #[tokio::test]
    async fn test_schema_failure_is_fatal() {
        let snapshot = exported_orders().await;
        let mut target = MemoryTarget::new();
        target.fail_when("CREATE SCHEMA [audit]", "permission denied");

        let err = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap_err();
        assert!(matches!(err, MigrateError::Replay { .. }));
        assert_eq!(target.rollbacks, 1);
        assert_eq!(target.commits, 0);
    }

    #[tokio::test]
    async fn test_check_constraint_failure_still_commits() {
        let snapshot = exported_orders().await;
        let mut target = MemoryTarget::new();
        target.fail_when("CHECK", "column does not allow this check");

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();

        assert_eq!(target.commits, 1);
        assert_eq!(target.rollbacks, 0);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].phase, ImportPhase::Constraints);
        assert_eq!(report.warnings[0].object, "dbo.orders.CK_orders_id");
        assert_eq!(report.check_constraints, 0);
        assert_eq!(report.foreign_keys, 1);
        assert_eq!(target.row_count("dbo.orders"), 2);
    }

    #[tokio::test]
    async fn test_procedural_failures_are_skipped() {
        let mut snapshot = exported_orders().await;
        snapshot
            .triggers
            .insert("dbo.orders.tr_bad".into(), "CREATE TRIGGER broken".into());
        snapshot
            .indexes
            .insert("dbo.orders.ix_bad".into(), "CREATE INDEX broken".into());
        let mut target = MemoryTarget::new();
        target.fail_when("broken", "syntax error");
        target.fail_when("FOREIGN KEY", "referenced object missing");

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();

        let phases: Vec<_> = report.warnings.iter().map(|w| w.phase).collect();
        assert_eq!(
            phases,
            vec![ImportPhase::Constraints, ImportPhase::Indexes, ImportPhase::Triggers]
        );
        assert_eq!(report.warnings[0].object, "dbo.order_items.FK_items_orders");
        assert_eq!(report.views, 1);
        assert_eq!(target.commits, 1);
    }

    #[tokio::test]
    async fn test_insert_failure_rolls_back_everything() {
        let snapshot = exported_orders().await;
        let mut target = MemoryTarget::new();
        target.fail_when("INSERT INTO dbo.order_items", "conversion failed");

        let mut orchestrator = ImportOrchestrator::new(&mut target);
        let err = orchestrator.run(&snapshot).await.unwrap_err();
        assert_eq!(orchestrator.phase(), ImportPhase::Rollback);

        match err {
            MigrateError::Replay { object, .. } => assert_eq!(object, "dbo.order_items"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(target.rollbacks, 1);
        assert_eq!(target.commits, 0);
        assert_eq!(target.row_count("dbo.orders"), 0);
        assert_eq!(target.row_count("dbo.order_items"), 0);
        assert!(target.committed.statements.is_empty());
    }

    #[tokio::test]
    async fn test_table_creation_failure_is_fatal() {
        let snapshot = exported_orders().await;
        let mut target = MemoryTarget::new();
        target.fail_when("CREATE TABLE [dbo].[order_items]", "There is already an object");

        let err = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap_err();
        assert!(err.to_string().contains("dbo.order_items"));
        assert_eq!(target.rollbacks, 1);
    }

    fn identity_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        let name = "dbo.tickets";
        snapshot.tables.insert(
            name.into(),
            table(name, vec![identity_column("id", 5), column("title", "nvarchar")]),
        );
        snapshot.data.insert(
            name.into(),
            (5..=7)
                .map(|id| {
                    row(&[
                        ("id", SqlValue::I32(id)),
                        ("title", SqlValue::String(format!("ticket {id}"))),
                    ])
                })
                .collect(),
        );
        snapshot.table_order.push(name.into());
        snapshot
    }

    #[tokio::test]
    async fn test_identity_values_are_preserved() {
        let snapshot = identity_snapshot();
        let mut target = MemoryTarget::new();

        ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();

        let ids: Vec<_> = target.committed.rows["dbo.tickets"]
            .iter()
            .map(|r| r[0].clone())
            .collect();
        assert_eq!(ids, vec![SqlValue::I32(5), SqlValue::I32(6), SqlValue::I32(7)]);
        assert_eq!(
            target.identity_log,
            vec![("dbo.tickets".to_string(), true), ("dbo.tickets".to_string(), false)]
        );
        assert_eq!(target.identity_insert, None);
    }

    #[tokio::test]
    async fn test_identity_insert_restored_after_failure() {
        let snapshot = identity_snapshot();
        let mut target = MemoryTarget::new();
        target.fail_when("INSERT INTO dbo.tickets", "deadlock");

        assert!(ImportOrchestrator::new(&mut target).run(&snapshot).await.is_err());
        assert_eq!(target.identity_insert, None);
        assert_eq!(target.identity_log.last(), Some(&("dbo.tickets".to_string(), false)));
    }

    #[tokio::test]
    async fn test_rows_are_batched() {
        let name = "dbo.events";
        let mut snapshot = Snapshot::new();
        snapshot
            .tables
            .insert(name.into(), table(name, vec![column("n", "int")]));
        snapshot.data.insert(
            name.into(),
            (0..2500).map(|n| row(&[("n", SqlValue::I32(n))])).collect(),
        );
        let mut target = MemoryTarget::new();

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();

        let sizes: Vec<_> = target.insert_log.iter().map(|(_, _, n)| *n).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert_eq!(report.rows_inserted, 2500);
        assert_eq!(target.committed.rows[name][2499], vec![SqlValue::I32(2499)]);
    }

    #[tokio::test]
    async fn test_row_version_columns_are_skipped() {
        let name = "dbo.docs";
        let mut snapshot = Snapshot::new();
        snapshot.tables.insert(
            name.into(),
            table(name, vec![column("id", "int"), column("rv", "timestamp")]),
        );
        snapshot.data.insert(
            name.into(),
            vec![row(&[("id", SqlValue::I32(1)), ("rv", SqlValue::Bytes(vec![0; 8]))])],
        );
        let mut target = MemoryTarget::new();

        ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();
        assert_eq!(target.insert_log[0].1, vec!["id".to_string()]);
    }

    #[tokio::test]
    async fn test_cells_decoded_with_destination_types() {
        let name = "dbo.readings";
        let mut snapshot = Snapshot::new();
        snapshot.tables.insert(
            name.into(),
            table(
                name,
                vec![column("level", "int"), column("taken", "date"), column("note", "nvarchar")],
            ),
        );
        let mut cells = row(&[
            ("level", SqlValue::I32(3)),
            ("taken", SqlValue::String("2024-05-06".into())),
        ]);
        cells.remove("note");
        snapshot.data.insert(name.into(), vec![cells]);

        let mut target = MemoryTarget::new();
        target.column_types.insert(
            name.into(),
            HashMap::from([("level".to_string(), "smallint".to_string())]),
        );

        ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();
        assert_eq!(
            target.committed.rows[name][0],
            vec![
                SqlValue::I16(3),
                SqlValue::Date(NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()),
                SqlValue::Null(crate::core::value::SqlNullType::String),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_collections_are_tolerated() {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "tables": {
                "dbo.orders": {
                    "schema_name": "dbo",
                    "table_name": "orders",
                    "create_statement": "CREATE TABLE [dbo].[orders] ([id] INT)"
                }
            }
        }))
        .unwrap();
        let mut target = MemoryTarget::new();

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();
        assert_eq!(report.tables_created, 1);
        assert_eq!(report.rows_inserted, 0);
        assert_eq!(target.commits, 1);
    }

    #[tokio::test]
    async fn test_non_empty_destination_warns() {
        let mut snapshot = Snapshot::new();
        snapshot.schemas.insert(
            "dbo".into(),
            SchemaInfo {
                schema_name: "dbo".into(),
                owner: "dbo".into(),
            },
        );
        let mut target = MemoryTarget::new();
        target.existing_user_tables = 3;

        let report = ImportOrchestrator::new(&mut target).run(&snapshot).await.unwrap();
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].phase, ImportPhase::Start);
        assert_eq!(target.commits, 1);
    }
}
