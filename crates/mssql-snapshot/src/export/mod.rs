//! Export orchestrator: catalog reads to a snapshot archive.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::archive;
use crate::codec;
use crate::core::identifier::split_qualified;
use crate::core::traits::CatalogReader;
use crate::core::value::SqlValue;
use crate::dependency::{build_dependency_map, resolve_table_order};
use crate::error::Result;
use crate::snapshot::ddl::create_table_statement;
use crate::snapshot::{ProceduralKind, Row, Snapshot, TableInfo};

/// Outcome of a completed export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    /// Where the archive was written.
    pub path: PathBuf,

    /// Source database name.
    pub database: String,

    /// Number of tables exported.
    pub tables: usize,

    /// Number of rows exported across all tables.
    pub total_records: u64,

    /// Procedures, functions, views, triggers, indexes and check constraints.
    pub procedural_objects: usize,

    /// Compressed archive size.
    pub archive_bytes: u64,

    /// Total duration in seconds.
    pub duration_seconds: f64,
}

impl ExportSummary {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Drives one export over a single catalog connection.
pub struct ExportOrchestrator<'a, R: CatalogReader + ?Sized> {
    reader: &'a mut R,
}

impl<'a, R: CatalogReader + ?Sized> ExportOrchestrator<'a, R> {
    pub fn new(reader: &'a mut R) -> Self {
        Self { reader }
    }

    /// Build the snapshot document in memory.
    ///
    /// Any failed read aborts the export; nothing is returned for a
    /// partially read database.
    pub async fn build_snapshot(&mut self) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();

        info!("Phase 1: Reading server metadata");
        snapshot.metadata.sql_server_version = self.reader.server_version().await?;
        let identity = self.reader.database_identity().await?;
        snapshot.metadata.database_name = identity.name;
        snapshot.metadata.collation = identity.collation;
        info!(
            "Source database: {} (collation {})",
            snapshot.metadata.database_name, snapshot.metadata.collation
        );

        info!("Phase 2: Reading schemas");
        for schema in self.reader.list_user_schemas().await? {
            snapshot.schemas.insert(schema.schema_name.clone(), schema);
        }
        info!("Found {} user schemas", snapshot.schemas.len());

        info!("Phase 3: Resolving table order");
        let tables = self.reader.list_user_tables().await?;
        let edges = self.reader.list_foreign_key_edges(&tables).await?;
        let dependencies = build_dependency_map(&tables, &edges);
        snapshot.table_order = resolve_table_order(&tables, &dependencies);
        info!(
            "Found {} tables with {} foreign-key dependencies",
            tables.len(),
            dependencies.values().map(Vec::len).sum::<usize>()
        );

        info!("Phase 4: Exporting table structure and data");
        for name in snapshot.table_order.clone() {
            let (table, rows) = self.export_table(&name).await?;
            info!("Exported {} ({} rows)", name, rows.len());
            snapshot.tables.insert(name.clone(), table);
            snapshot.data.insert(name, rows);
        }

        info!("Phase 5: Exporting procedural objects");
        for kind in ProceduralKind::ALL {
            let objects = self.reader.list_procedural_objects(kind).await?;
            debug!("Found {} {} definitions", objects.len(), kind);
            snapshot.procedural_mut(kind).extend(objects);
        }

        snapshot.metadata.total_tables = snapshot.tables.len();
        snapshot.metadata.total_records = snapshot.total_rows();

        Ok(snapshot)
    }

    async fn export_table(&mut self, name: &str) -> Result<(TableInfo, Vec<Row>)> {
        let (schema, table_name) = split_qualified(name);

        let mut table = TableInfo {
            schema_name: schema.to_string(),
            table_name: table_name.to_string(),
            ..Default::default()
        };
        table.columns = self.reader.columns(schema, table_name).await?;
        table.primary_key = self.reader.primary_key(schema, table_name).await?;
        table.foreign_keys = self.reader.foreign_keys(schema, table_name).await?;
        table.create_statement = create_table_statement(&table)?;
        table.row_count = self.reader.row_count(name).await?;

        let column_names: Vec<String> = table
            .columns
            .iter()
            .map(|c| c.column_name.clone())
            .collect();
        let mut rows: Vec<Row> = Vec::with_capacity(table.row_count.max(0) as usize);

        let mut sink = |values: Vec<SqlValue>| -> Result<()> {
            let row: Row = column_names
                .iter()
                .cloned()
                .zip(values.iter().map(codec::encode))
                .collect();
            rows.push(row);
            Ok(())
        };
        self.reader.stream_rows(name, &table.columns, &mut sink).await?;

        Ok((table, rows))
    }

    /// Export to an archive at `path`.
    pub async fn run(&mut self, path: &Path) -> Result<ExportSummary> {
        let started = Instant::now();
        let snapshot = self.build_snapshot().await?;

        info!("Phase 6: Writing archive {}", path.display());
        let archive_bytes = archive::write_snapshot(path, &snapshot)?;

        let procedural_objects = ProceduralKind::ALL
            .iter()
            .map(|kind| snapshot.procedural(*kind).len())
            .sum();

        let summary = ExportSummary {
            path: path.to_path_buf(),
            database: snapshot.metadata.database_name.clone(),
            tables: snapshot.metadata.total_tables,
            total_records: snapshot.metadata.total_records,
            procedural_objects,
            archive_bytes,
            duration_seconds: started.elapsed().as_secs_f64(),
        };
        info!(
            "Export complete: {} tables, {} rows in {:.1}s",
            summary.tables, summary.total_records, summary.duration_seconds
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, EncodedValue};
    use crate::error::MigrateError;
    use crate::testing::{column, MemoryCatalog};
    use tempfile::TempDir;

    fn orders_catalog() -> MemoryCatalog {
        let mut catalog = MemoryCatalog::new("Sales");
        catalog.add_schema("dbo", "dbo");
        // Dependent table listed first so ordering has work to do.
        catalog.add_table(
            "dbo.order_items",
            vec![column("id", "int"), column("order_id", "int"), column("sku", "varbinary")],
            &["id"],
        );
        catalog.add_table(
            "dbo.orders",
            vec![column("id", "int"), column("placed", "datetime2")],
            &["id"],
        );
        catalog.add_foreign_key("dbo.order_items", "FK_items_orders", "order_id", "dbo.orders", "id");
        catalog.add_rows(
            "dbo.orders",
            vec![vec![
                SqlValue::I32(1),
                SqlValue::DateTime(
                    chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
                        .unwrap()
                        .and_hms_opt(3, 4, 5)
                        .unwrap(),
                ),
            ]],
        );
        catalog.add_rows(
            "dbo.order_items",
            vec![vec![SqlValue::I32(10), SqlValue::I32(1), SqlValue::Bytes(vec![7, 8])]],
        );
        catalog.add_procedural(ProceduralKind::View, "dbo.v_orders", "CREATE VIEW dbo.v_orders AS SELECT 1 AS x");
        catalog
    }

    #[tokio::test]
    async fn test_build_snapshot_orders_and_encodes() {
        let mut catalog = orders_catalog();
        let snapshot = ExportOrchestrator::new(&mut catalog)
            .build_snapshot()
            .await
            .unwrap();

        assert_eq!(snapshot.table_order, vec!["dbo.orders", "dbo.order_items"]);
        assert_eq!(snapshot.metadata.database_name, "Sales");
        assert_eq!(snapshot.metadata.total_tables, 2);
        assert_eq!(snapshot.metadata.total_records, 2);
        assert_eq!(snapshot.views.len(), 1);

        let items = &snapshot.tables["dbo.order_items"];
        assert!(items.create_statement.starts_with("CREATE TABLE [dbo].[order_items] ("));
        assert_eq!(items.foreign_keys[0].referenced_table, "orders");

        let row = &snapshot.data["dbo.order_items"][0];
        assert!(matches!(row["sku"], EncodedValue::Tagged(_)));
        assert_eq!(decode(&row["sku"], "varbinary"), SqlValue::Bytes(vec![7, 8]));
    }

    #[tokio::test]
    async fn test_run_writes_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sales.gz");
        let mut catalog = orders_catalog();

        let summary = ExportOrchestrator::new(&mut catalog).run(&path).await.unwrap();
        assert_eq!(summary.tables, 2);
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.procedural_objects, 1);

        let loaded = archive::read_snapshot(&path).unwrap();
        assert_eq!(loaded.table_order, vec!["dbo.orders", "dbo.order_items"]);
    }

    #[tokio::test]
    async fn test_failed_read_writes_no_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sales.gz");
        let mut catalog = orders_catalog();
        catalog.fail_rows_for("dbo.order_items");

        let err = ExportOrchestrator::new(&mut catalog).run(&path).await.unwrap_err();
        assert!(matches!(err, MigrateError::CatalogRead { .. }));
        assert!(!path.exists());
    }
}
