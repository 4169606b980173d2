//! Statement replay and row inserts against a destination SQL Server database.

use std::collections::HashMap;

use async_trait::async_trait;
use tiberius::ToSql;
use tracing::debug;

use crate::core::identifier::{quote_mssql, quote_qualified, split_qualified};
use crate::core::traits::ReplayTarget;
use crate::core::value::{SqlNullType, SqlValue};
use crate::error::{MigrateError, Result};

use super::MssqlConnection;

/// Parameters a single RPC request may carry. `sp_executesql` spends two of
/// them on the statement text and the parameter declaration.
const MAX_PARAMS_PER_STATEMENT: usize = 2098;

/// Row constructors allowed in one `INSERT ... VALUES` statement.
const MAX_ROWS_PER_STATEMENT: usize = 1000;

/// Rows per INSERT so that neither server limit is exceeded.
fn rows_per_statement(column_count: usize) -> usize {
    (MAX_PARAMS_PER_STATEMENT / column_count.max(1)).clamp(1, MAX_ROWS_PER_STATEMENT)
}

/// `INSERT INTO t (cols) VALUES (@P1, ..), (..)` for `row_count` rows.
fn insert_sql(qualified_table: &str, column_list: &str, column_count: usize, row_count: usize) -> String {
    let mut param_idx = 1;
    let value_groups: Vec<String> = (0..row_count)
        .map(|_| {
            let placeholders: Vec<String> = (0..column_count)
                .map(|_| {
                    let p = format!("@P{}", param_idx);
                    param_idx += 1;
                    p
                })
                .collect();
            format!("({})", placeholders.join(", "))
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualified_table,
        column_list,
        value_groups.join(", ")
    )
}

fn sql_value_to_sql_param(value: &SqlValue) -> Box<dyn ToSql> {
    match value {
        SqlValue::Null(null_type) => typed_null(*null_type),
        SqlValue::Bool(b) => Box::new(*b),
        SqlValue::U8(v) => Box::new(*v),
        SqlValue::I16(i) => Box::new(*i),
        SqlValue::I32(i) => Box::new(*i),
        SqlValue::I64(i) => Box::new(*i),
        SqlValue::F32(f) => Box::new(*f),
        SqlValue::F64(f) => Box::new(*f),
        SqlValue::Decimal(d) => Box::new(*d),
        SqlValue::Uuid(u) => Box::new(*u),
        SqlValue::String(s) | SqlValue::LongText(s) | SqlValue::Clob(s) => Box::new(s.clone()),
        SqlValue::Bytes(b) | SqlValue::Blob(b) => Box::new(b.clone()),
        SqlValue::DateTime(dt) => Box::new(*dt),
        SqlValue::DateTimeOffset(dto) => Box::new(*dto),
        SqlValue::Date(d) => Box::new(*d),
        SqlValue::Time(t) => Box::new(*t),
    }
}

/// NULL bound with the column's type so the server does not have to
/// convert from NVARCHAR (which fails for binary columns).
fn typed_null(null_type: SqlNullType) -> Box<dyn ToSql> {
    match null_type {
        SqlNullType::Bool => Box::new(Option::<bool>::None),
        SqlNullType::U8 => Box::new(Option::<u8>::None),
        SqlNullType::I16 => Box::new(Option::<i16>::None),
        SqlNullType::I32 => Box::new(Option::<i32>::None),
        SqlNullType::I64 => Box::new(Option::<i64>::None),
        SqlNullType::F32 => Box::new(Option::<f32>::None),
        SqlNullType::F64 => Box::new(Option::<f64>::None),
        SqlNullType::String => Box::new(Option::<String>::None),
        SqlNullType::Bytes => Box::new(Option::<Vec<u8>>::None),
        SqlNullType::Uuid => Box::new(Option::<uuid::Uuid>::None),
        SqlNullType::Decimal => Box::new(Option::<rust_decimal::Decimal>::None),
        SqlNullType::DateTime => Box::new(Option::<chrono::NaiveDateTime>::None),
        SqlNullType::DateTimeOffset => {
            Box::new(Option::<chrono::DateTime<chrono::FixedOffset>>::None)
        }
        SqlNullType::Date => Box::new(Option::<chrono::NaiveDate>::None),
        SqlNullType::Time => Box::new(Option::<chrono::NaiveTime>::None),
    }
}

#[async_trait]
impl ReplayTarget for MssqlConnection {
    async fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN TRANSACTION").await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT TRANSACTION").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.batch("IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await?;
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.batch(sql).await?;
        Ok(())
    }

    async fn create_schema(&mut self, name: &str) -> Result<()> {
        let quoted_schema = quote_mssql(name)?;
        let query = format!(
            "IF NOT EXISTS (SELECT 1 FROM sys.schemas WHERE name = @P1) EXEC(N'CREATE SCHEMA {}')",
            quoted_schema.replace('\'', "''")
        );
        self.client.execute(query, &[&name]).await?;
        debug!("Created schema: {}", name);
        Ok(())
    }

    async fn count_user_tables(&mut self) -> Result<i64> {
        let row = self
            .client
            .simple_query("SELECT COUNT_BIG(*) FROM sys.tables WHERE is_ms_shipped = 0")
            .await?
            .into_row()
            .await?;
        Ok(row
            .and_then(|r| r.try_get::<i64, _>(0).ok().flatten())
            .unwrap_or(0))
    }

    async fn column_types(&mut self, table: &str) -> Result<HashMap<String, String>> {
        let (schema, name) = split_qualified(table);
        let rows = self
            .client
            .query(
                "SELECT COLUMN_NAME, DATA_TYPE FROM INFORMATION_SCHEMA.COLUMNS
                 WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2",
                &[&schema, &name],
            )
            .await?
            .into_first_result()
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let column = row.try_get::<&str, _>(0).ok().flatten()?;
                let data_type = row.try_get::<&str, _>(1).ok().flatten()?;
                Some((column.to_string(), data_type.to_string()))
            })
            .collect())
    }

    async fn set_identity_insert(&mut self, table: &str, enabled: bool) -> Result<()> {
        let sql = format!(
            "SET IDENTITY_INSERT {} {}",
            quote_qualified(table)?,
            if enabled { "ON" } else { "OFF" }
        );
        self.batch(&sql).await?;
        Ok(())
    }

    async fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        if columns.is_empty() {
            return Err(MigrateError::replay(table, "Cannot insert with zero columns"));
        }

        let qualified_table = quote_qualified(table)?;
        let column_list = columns
            .iter()
            .map(|c| quote_mssql(c))
            .collect::<Result<Vec<_>>>()?
            .join(", ");

        let mut total_inserted = 0u64;
        for chunk in rows.chunks(rows_per_statement(columns.len())) {
            let sql = insert_sql(&qualified_table, &column_list, columns.len(), chunk.len());

            let params: Vec<Box<dyn ToSql>> = chunk
                .iter()
                .flat_map(|row| row.iter().map(sql_value_to_sql_param))
                .collect();
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();

            self.client
                .execute(sql.as_str(), &param_refs)
                .await
                .map_err(|e| MigrateError::replay(table, e))?;

            total_inserted += chunk.len() as u64;
        }

        debug!("Inserted {} rows into {}", total_inserted, table);
        Ok(total_inserted)
    }
}
