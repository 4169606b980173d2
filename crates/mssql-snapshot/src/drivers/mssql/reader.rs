//! Catalog and row reads against a source SQL Server database.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use futures::TryStreamExt;
use rust_decimal::Decimal;
use tiberius::numeric::Numeric;
use tiberius::{Query, Row};
use tracing::debug;
use uuid::Uuid;

use crate::core::identifier::{quote_mssql, quote_qualified};
use crate::core::traits::{CatalogReader, DatabaseIdentity, RowSink};
use crate::core::value::{SqlNullType, SqlValue};
use crate::error::{MigrateError, Result};
use crate::snapshot::ddl::{check_constraint_statement, index_statement, IndexColumn};
use crate::snapshot::{ColumnInfo, ForeignKeyInfo, ProceduralKind, SchemaInfo};

use super::MssqlConnection;

/// Schemas that belong to the server, not to the application.
const EXCLUDED_SCHEMAS: [&str; 12] = [
    "sys",
    "INFORMATION_SCHEMA",
    "guest",
    "db_owner",
    "db_accessadmin",
    "db_securityadmin",
    "db_ddladmin",
    "db_backupoperator",
    "db_datareader",
    "db_datawriter",
    "db_denydatareader",
    "db_denydatawriter",
];

/// Column metadata. The type is joined on `user_type_id` so CLR types
/// (`geography`, `geometry`, `hierarchyid`) are kept; alias types resolve to
/// their base system type.
const COLUMNS_QUERY: &str = r#"
    SELECT
        c.name,
        tn.type_name,
        CAST(CASE
            WHEN c.max_length = -1 THEN -1
            WHEN tn.type_name IN ('nchar', 'nvarchar') THEN c.max_length / 2
            WHEN tn.type_name IN ('char', 'varchar', 'binary', 'varbinary') THEN c.max_length
            ELSE 0
        END AS INT),
        CAST(c.precision AS INT),
        CAST(c.scale AS INT),
        CAST(c.is_nullable AS INT),
        dc.definition,
        CAST(c.is_identity AS INT),
        CAST(ic.seed_value AS BIGINT),
        CAST(ic.increment_value AS BIGINT)
    FROM sys.columns c
    JOIN sys.types ty ON ty.user_type_id = c.user_type_id
    LEFT JOIN sys.types bt
        ON bt.user_type_id = c.system_type_id
        AND ty.is_user_defined = 1
        AND ty.is_assembly_type = 0
    CROSS APPLY (SELECT COALESCE(bt.name, ty.name) AS type_name) tn
    JOIN sys.tables t ON c.object_id = t.object_id
    JOIN sys.schemas s ON t.schema_id = s.schema_id
    LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id
    LEFT JOIN sys.identity_columns ic ON ic.object_id = c.object_id AND ic.column_id = c.column_id
    WHERE s.name = @P1 AND t.name = @P2
    ORDER BY c.column_id
"#;

const PRIMARY_KEY_QUERY: &str = r#"
    SELECT c.COLUMN_NAME
    FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
    JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE c
        ON c.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
        AND c.TABLE_SCHEMA = tc.TABLE_SCHEMA
        AND c.TABLE_NAME = tc.TABLE_NAME
    WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
      AND tc.TABLE_SCHEMA = @P1
      AND tc.TABLE_NAME = @P2
    ORDER BY c.ORDINAL_POSITION
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        fk.name,
        pc.name,
        rs.name,
        rt.name,
        rc.name,
        fk.delete_referential_action_desc,
        fk.update_referential_action_desc
    FROM sys.foreign_keys fk
    JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
    JOIN sys.tables pt ON fk.parent_object_id = pt.object_id
    JOIN sys.schemas ps ON pt.schema_id = ps.schema_id
    JOIN sys.tables rt ON fk.referenced_object_id = rt.object_id
    JOIN sys.schemas rs ON rt.schema_id = rs.schema_id
    JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
    JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
    WHERE ps.name = @P1 AND pt.name = @P2
    ORDER BY fk.name, fkc.constraint_column_id
"#;

const FOREIGN_KEY_EDGES_QUERY: &str = r#"
    SELECT DISTINCT
        ps.name + '.' + pt.name,
        rs.name + '.' + rt.name
    FROM sys.foreign_keys fk
    JOIN sys.tables pt ON fk.parent_object_id = pt.object_id
    JOIN sys.schemas ps ON pt.schema_id = ps.schema_id
    JOIN sys.tables rt ON fk.referenced_object_id = rt.object_id
    JOIN sys.schemas rs ON rt.schema_id = rs.schema_id
    WHERE pt.is_ms_shipped = 0
"#;

const INDEXES_QUERY: &str = r#"
    SELECT
        s.name,
        t.name,
        i.name,
        CAST(i.is_unique AS INT),
        c.name,
        CAST(ic.is_descending_key AS INT)
    FROM sys.indexes i
    JOIN sys.tables t ON i.object_id = t.object_id
    JOIN sys.schemas s ON t.schema_id = s.schema_id
    JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
    JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    WHERE t.is_ms_shipped = 0
      AND i.type > 0
      AND i.is_primary_key = 0
      AND i.is_unique_constraint = 0
      AND ic.is_included_column = 0
    ORDER BY s.name, t.name, i.name, ic.key_ordinal
"#;

const CHECK_CONSTRAINTS_QUERY: &str = r#"
    SELECT s.name, t.name, cc.name, cc.definition
    FROM sys.check_constraints cc
    JOIN sys.tables t ON cc.parent_object_id = t.object_id
    JOIN sys.schemas s ON t.schema_id = s.schema_id
    WHERE t.is_ms_shipped = 0
    ORDER BY s.name, t.name, cc.name
"#;

/// `(name, definition)` query for module-backed object kinds.
fn module_query(kind: ProceduralKind) -> Option<&'static str> {
    let sql = match kind {
        ProceduralKind::Procedure => {
            r#"
            SELECT s.name + '.' + o.name, m.definition
            FROM sys.procedures o
            JOIN sys.schemas s ON o.schema_id = s.schema_id
            JOIN sys.sql_modules m ON m.object_id = o.object_id
            WHERE o.is_ms_shipped = 0
            ORDER BY s.name, o.name
            "#
        }
        ProceduralKind::Function => {
            r#"
            SELECT s.name + '.' + o.name, m.definition
            FROM sys.objects o
            JOIN sys.schemas s ON o.schema_id = s.schema_id
            JOIN sys.sql_modules m ON m.object_id = o.object_id
            WHERE o.type IN ('FN', 'IF', 'TF') AND o.is_ms_shipped = 0
            ORDER BY s.name, o.name
            "#
        }
        ProceduralKind::View => {
            r#"
            SELECT s.name + '.' + o.name, m.definition
            FROM sys.views o
            JOIN sys.schemas s ON o.schema_id = s.schema_id
            JOIN sys.sql_modules m ON m.object_id = o.object_id
            WHERE o.is_ms_shipped = 0
            ORDER BY s.name, o.name
            "#
        }
        ProceduralKind::Trigger => {
            r#"
            SELECT s.name + '.' + t.name + '.' + tr.name, m.definition
            FROM sys.triggers tr
            JOIN sys.tables t ON tr.parent_id = t.object_id
            JOIN sys.schemas s ON t.schema_id = s.schema_id
            JOIN sys.sql_modules m ON m.object_id = tr.object_id
            WHERE tr.is_ms_shipped = 0
            ORDER BY s.name, t.name, tr.name
            "#
        }
        ProceduralKind::Index | ProceduralKind::CheckConstraint => return None,
    };
    Some(sql)
}

/// How a column is selected and converted when rows are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Bool,
    U8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Uuid,
    DateTime,
    DateTimeOffset,
    Date,
    Time,
    LongText,
    Clob,
    Blob,
    Bytes,
    /// Spatial types, selected as well-known text.
    Spatial,
    /// Types without a client representation, selected as NVARCHAR(MAX).
    CastText,
    Text,
}

impl CellKind {
    fn for_column(column: &ColumnInfo) -> Self {
        let unbounded = column.max_length == -1;
        match column.data_type.to_lowercase().as_str() {
            "bit" => CellKind::Bool,
            "tinyint" => CellKind::U8,
            "smallint" => CellKind::I16,
            "int" => CellKind::I32,
            "bigint" => CellKind::I64,
            "real" => CellKind::F32,
            "float" => CellKind::F64,
            "decimal" | "numeric" | "money" | "smallmoney" => CellKind::Decimal,
            "uniqueidentifier" => CellKind::Uuid,
            "datetime" | "datetime2" | "smalldatetime" => CellKind::DateTime,
            "datetimeoffset" => CellKind::DateTimeOffset,
            "date" => CellKind::Date,
            "time" => CellKind::Time,
            "text" | "ntext" => CellKind::LongText,
            "varchar" | "nvarchar" if unbounded => CellKind::Clob,
            "xml" => CellKind::Clob,
            "varbinary" if unbounded => CellKind::Blob,
            "binary" | "varbinary" | "image" | "timestamp" | "rowversion" => CellKind::Bytes,
            "geography" | "geometry" => CellKind::Spatial,
            "hierarchyid" | "sql_variant" => CellKind::CastText,
            _ => CellKind::Text,
        }
    }

    /// Select-list expression for `column`.
    fn select_expression(self, column: &ColumnInfo) -> Result<String> {
        let quoted = quote_mssql(&column.column_name)?;
        Ok(match (self, column.data_type.to_lowercase().as_str()) {
            (CellKind::Spatial, _) => format!("{0}.STAsText() AS {0}", quoted),
            (CellKind::CastText, _) | (CellKind::Clob, "xml") => {
                format!("CAST({0} AS NVARCHAR(MAX)) AS {0}", quoted)
            }
            (CellKind::Decimal, "money" | "smallmoney") => {
                format!("CAST({0} AS DECIMAL(19,4)) AS {0}", quoted)
            }
            _ => quoted,
        })
    }

    fn read(self, row: &Row, idx: usize) -> tiberius::Result<SqlValue> {
        Ok(match self {
            CellKind::Bool => row
                .try_get::<bool, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::Bool), SqlValue::Bool),
            CellKind::U8 => row
                .try_get::<u8, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::U8), SqlValue::U8),
            CellKind::I16 => row
                .try_get::<i16, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::I16), SqlValue::I16),
            CellKind::I32 => row
                .try_get::<i32, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::I32), SqlValue::I32),
            CellKind::I64 => row
                .try_get::<i64, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::I64), SqlValue::I64),
            CellKind::F32 => row
                .try_get::<f32, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::F32), SqlValue::F32),
            CellKind::F64 => row
                .try_get::<f64, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::F64), SqlValue::F64),
            CellKind::Decimal => row
                .try_get::<Numeric, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::Decimal), |n| {
                    numeric_value(n.value(), n.scale())
                }),
            CellKind::Uuid => row
                .try_get::<Uuid, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::Uuid), SqlValue::Uuid),
            CellKind::DateTime => row
                .try_get::<NaiveDateTime, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::DateTime), SqlValue::DateTime),
            CellKind::DateTimeOffset => row
                .try_get::<DateTime<FixedOffset>, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::DateTimeOffset), SqlValue::DateTimeOffset),
            CellKind::Date => row
                .try_get::<NaiveDate, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::Date), SqlValue::Date),
            CellKind::Time => row
                .try_get::<NaiveTime, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::Time), SqlValue::Time),
            CellKind::LongText => row
                .try_get::<&str, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::String), |s| {
                    SqlValue::LongText(s.to_string())
                }),
            CellKind::Clob => row
                .try_get::<&str, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::String), |s| {
                    SqlValue::Clob(s.to_string())
                }),
            CellKind::Blob => row
                .try_get::<&[u8], _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::Bytes), |b| SqlValue::Blob(b.to_vec())),
            CellKind::Bytes => row
                .try_get::<&[u8], _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::Bytes), |b| SqlValue::Bytes(b.to_vec())),
            CellKind::Spatial | CellKind::CastText | CellKind::Text => row
                .try_get::<&str, _>(idx)?
                .map_or(SqlValue::Null(SqlNullType::String), |s| {
                    SqlValue::String(s.to_string())
                }),
        })
    }
}

/// Convert a raw numeric cell. Values outside `Decimal`'s range (more than
/// 28 fractional digits, or above about 7.9e28) are kept as exact text.
fn numeric_value(value: i128, scale: u8) -> SqlValue {
    match Decimal::try_from_i128_with_scale(value, u32::from(scale)) {
        Ok(decimal) => SqlValue::Decimal(decimal),
        Err(_) => SqlValue::String(numeric_text(value, scale)),
    }
}

fn numeric_text(value: i128, scale: u8) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let digits = value.unsigned_abs().to_string();
    let scale = usize::from(scale);
    if scale == 0 {
        return format!("{}{}", sign, digits);
    }
    let digits = format!("{:0>width$}", digits, width = scale + 1);
    let (int_part, frac_part) = digits.split_at(digits.len() - scale);
    format!("{}{}.{}", sign, int_part, frac_part)
}

/// `SELECT` reading every column of `table` in the given order.
fn select_rows_sql(table: &str, columns: &[ColumnInfo], kinds: &[CellKind]) -> Result<String> {
    let select_list = columns
        .iter()
        .zip(kinds)
        .map(|(column, kind)| kind.select_expression(column))
        .collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "SELECT {} FROM {}",
        select_list.join(", "),
        quote_qualified(table)?
    ))
}

fn excluded_schema_list() -> String {
    EXCLUDED_SCHEMAS
        .iter()
        .map(|s| format!("'{}'", s))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Text cell; NULL reads as empty.
fn text(row: &Row, idx: usize) -> tiberius::Result<String> {
    Ok(row.try_get::<&str, _>(idx)?.unwrap_or_default().to_string())
}

fn int(row: &Row, idx: usize) -> tiberius::Result<i32> {
    Ok(row.try_get::<i32, _>(idx)?.unwrap_or(0))
}

/// Convert every row, reporting the first conversion failure as a catalog error.
fn convert_rows<R, T>(
    label: &str,
    rows: &[R],
    convert: impl Fn(&R) -> tiberius::Result<T>,
) -> Result<Vec<T>> {
    rows.iter()
        .map(convert)
        .collect::<tiberius::Result<Vec<_>>>()
        .map_err(|e| MigrateError::catalog(label, e))
}

impl MssqlConnection {
    async fn fetch(&mut self, label: &str, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let mut query = Query::new(sql);
        for param in params {
            query.bind(*param);
        }
        let stream = query
            .query(&mut self.client)
            .await
            .map_err(|e| MigrateError::catalog(label, e))?;
        stream
            .into_first_result()
            .await
            .map_err(|e| MigrateError::catalog(label, e))
    }

    async fn list_indexes(&mut self) -> Result<Vec<(String, String)>> {
        let rows = self.fetch("indexes", INDEXES_QUERY, &[]).await?;
        let entries = convert_rows("indexes", &rows, |row| {
            let key = (text(row, 0)?, text(row, 1)?, text(row, 2)?);
            let column = IndexColumn {
                name: text(row, 4)?,
                descending: int(row, 5)? == 1,
            };
            Ok((key, int(row, 3)? == 1, column))
        })?;

        // (schema, table, index) -> (unique, key columns), in query order.
        let mut grouped: Vec<((String, String, String), bool, Vec<IndexColumn>)> = Vec::new();
        for (key, unique, column) in entries {
            let continues_last = grouped.last().map_or(false, |(last, _, _)| *last == key);
            match grouped.last_mut() {
                Some((_, _, columns)) if continues_last => columns.push(column),
                _ => grouped.push((key, unique, vec![column])),
            }
        }

        grouped
            .into_iter()
            .map(|((schema, table, index), unique, columns)| -> Result<(String, String)> {
                let sql = index_statement(&schema, &table, &index, unique, &columns)?;
                Ok((format!("{}.{}.{}", schema, table, index), sql))
            })
            .collect()
    }

    async fn list_check_constraints(&mut self) -> Result<Vec<(String, String)>> {
        let rows = self
            .fetch("check constraints", CHECK_CONSTRAINTS_QUERY, &[])
            .await?;
        let entries = convert_rows("check constraints", &rows, |row| {
            Ok((text(row, 0)?, text(row, 1)?, text(row, 2)?, text(row, 3)?))
        })?;
        entries
            .into_iter()
            .map(|(schema, table, name, definition)| -> Result<(String, String)> {
                let sql = check_constraint_statement(&schema, &table, &name, &definition)?;
                Ok((format!("{}.{}.{}", schema, table, name), sql))
            })
            .collect()
    }
}

#[async_trait]
impl CatalogReader for MssqlConnection {
    async fn server_version(&mut self) -> Result<String> {
        let rows = self.fetch("server version", "SELECT @@VERSION", &[]).await?;
        let versions = convert_rows("server version", &rows, |row| text(row, 0))?;
        Ok(versions.into_iter().next().unwrap_or_default())
    }

    async fn database_identity(&mut self) -> Result<DatabaseIdentity> {
        let rows = self
            .fetch(
                "database identity",
                "SELECT DB_NAME(), CAST(DATABASEPROPERTYEX(DB_NAME(), 'Collation') AS NVARCHAR(128))",
                &[],
            )
            .await?;
        let identities = convert_rows("database identity", &rows, |row| {
            Ok(DatabaseIdentity {
                name: text(row, 0)?,
                collation: text(row, 1)?,
            })
        })?;
        Ok(identities.into_iter().next().unwrap_or_default())
    }

    async fn list_user_schemas(&mut self) -> Result<Vec<SchemaInfo>> {
        let sql = format!(
            "SELECT s.name, p.name
             FROM sys.schemas s
             JOIN sys.database_principals p ON s.principal_id = p.principal_id
             WHERE s.name NOT IN ({})
             ORDER BY s.name",
            excluded_schema_list()
        );
        let rows = self.fetch("schemas", &sql, &[]).await?;
        convert_rows("schemas", &rows, |row| {
            Ok(SchemaInfo {
                schema_name: text(row, 0)?,
                owner: text(row, 1)?,
            })
        })
    }

    async fn list_user_tables(&mut self) -> Result<Vec<String>> {
        let rows = self
            .fetch(
                "tables",
                "SELECT s.name + '.' + t.name
                 FROM sys.tables t
                 JOIN sys.schemas s ON t.schema_id = s.schema_id
                 WHERE t.is_ms_shipped = 0
                 ORDER BY s.name, t.name",
                &[],
            )
            .await?;
        convert_rows("tables", &rows, |row| text(row, 0))
    }

    async fn list_foreign_key_edges(&mut self, tables: &[String]) -> Result<Vec<(String, String)>> {
        let rows = self
            .fetch("foreign key edges", FOREIGN_KEY_EDGES_QUERY, &[])
            .await?;
        let edges = convert_rows("foreign key edges", &rows, |row| {
            Ok((text(row, 0)?, text(row, 1)?))
        })?;
        Ok(edges
            .into_iter()
            .filter(|(dependent, _)| tables.contains(dependent))
            .collect())
    }

    async fn columns(&mut self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        let label = format!("columns of {}.{}", schema, table);
        let rows = self.fetch(&label, COLUMNS_QUERY, &[schema, table]).await?;

        let columns = convert_rows(&label, &rows, |row| {
            Ok(ColumnInfo {
                column_name: text(row, 0)?,
                data_type: text(row, 1)?,
                max_length: int(row, 2)?,
                precision: int(row, 3)?,
                scale: int(row, 4)?,
                is_nullable: int(row, 5)? == 1,
                default_value: row.try_get::<&str, _>(6)?.map(String::from),
                is_identity: int(row, 7)? == 1,
                identity_seed: row.try_get::<i64, _>(8)?,
                identity_increment: row.try_get::<i64, _>(9)?,
            })
        })?;

        debug!("Loaded {} columns for {}.{}", columns.len(), schema, table);
        Ok(columns)
    }

    async fn primary_key(&mut self, schema: &str, table: &str) -> Result<Vec<String>> {
        let label = format!("primary key of {}.{}", schema, table);
        let rows = self.fetch(&label, PRIMARY_KEY_QUERY, &[schema, table]).await?;
        convert_rows(&label, &rows, |row| text(row, 0))
    }

    async fn foreign_keys(&mut self, schema: &str, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let label = format!("foreign keys of {}.{}", schema, table);
        let rows = self.fetch(&label, FOREIGN_KEYS_QUERY, &[schema, table]).await?;
        convert_rows(&label, &rows, |row| {
            Ok(ForeignKeyInfo {
                constraint_name: text(row, 0)?,
                column_name: text(row, 1)?,
                referenced_schema: text(row, 2)?,
                referenced_table: text(row, 3)?,
                referenced_column: text(row, 4)?,
                delete_rule: text(row, 5)?,
                update_rule: text(row, 6)?,
            })
        })
    }

    async fn row_count(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT_BIG(*) FROM {}", quote_qualified(table)?);
        let label = format!("row count of {}", table);
        let rows = self.fetch(&label, &sql, &[]).await?;
        let counts = convert_rows(&label, &rows, |row| row.try_get::<i64, _>(0))?;
        Ok(counts.into_iter().next().flatten().unwrap_or(0))
    }

    async fn stream_rows(
        &mut self,
        table: &str,
        columns: &[ColumnInfo],
        sink: &mut RowSink<'_>,
    ) -> Result<u64> {
        if columns.is_empty() {
            return Ok(0);
        }
        let kinds: Vec<CellKind> = columns.iter().map(CellKind::for_column).collect();
        let sql = select_rows_sql(table, columns, &kinds)?;
        let label = format!("rows of {}", table);

        let stream = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| MigrateError::catalog(&label, e))?;
        let mut rows = stream.into_row_stream();

        let mut delivered = 0u64;
        while let Some(row) = rows
            .try_next()
            .await
            .map_err(|e| MigrateError::catalog(&label, e))?
        {
            let values = kinds
                .iter()
                .enumerate()
                .map(|(idx, kind)| kind.read(&row, idx))
                .collect::<tiberius::Result<Vec<_>>>()
                .map_err(|e| MigrateError::catalog(&label, e))?;
            sink(values)?;
            delivered += 1;
        }

        Ok(delivered)
    }

    async fn list_procedural_objects(&mut self, kind: ProceduralKind) -> Result<Vec<(String, String)>> {
        match kind {
            ProceduralKind::Index => self.list_indexes().await,
            ProceduralKind::CheckConstraint => self.list_check_constraints().await,
            _ => {
                let sql = module_query(kind).unwrap_or_default();
                let label = kind.to_string();
                let rows = self.fetch(&label, sql, &[]).await?;
                let modules = convert_rows(&label, &rows, |row| {
                    let definition = row.try_get::<&str, _>(1)?.map(String::from);
                    Ok((text(row, 0)?, definition))
                })?;
                // Encrypted modules have no visible definition and are skipped.
                Ok(modules
                    .into_iter()
                    .filter_map(|(name, definition)| Some((name, definition?)))
                    .collect())
            }
        }
    }
}
