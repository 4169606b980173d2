//! DDL generation from captured table structure.

use crate::core::identifier::{qualify_mssql, quote_mssql};
use crate::error::Result;

use super::{ColumnInfo, ForeignKeyInfo, TableInfo};

/// Render a column's type with its length or precision suffix.
pub fn column_type_sql(column: &ColumnInfo) -> String {
    let base = column.data_type.to_uppercase();
    match column.data_type.to_lowercase().as_str() {
        "char" | "varchar" | "nchar" | "nvarchar" | "binary" | "varbinary" => {
            if column.max_length > 0 {
                format!("{}({})", base, column.max_length)
            } else {
                format!("{}(MAX)", base)
            }
        }
        "decimal" | "numeric" => format!("{}({},{})", base, column.precision, column.scale),
        _ => base,
    }
}

/// Generate the CREATE TABLE statement stored in the snapshot.
///
/// One column per line; the primary key, if any, becomes a named
/// `PK_<table>` table constraint.
pub fn create_table_statement(table: &TableInfo) -> Result<String> {
    let mut column_defs = Vec::with_capacity(table.columns.len() + 1);

    for column in &table.columns {
        let mut def = format!("    {} {}", quote_mssql(&column.column_name)?, column_type_sql(column));

        if column.is_identity {
            def.push_str(&format!(
                " IDENTITY({},{})",
                column.identity_seed.unwrap_or(1),
                column.identity_increment.unwrap_or(1)
            ));
        }
        if !column.is_nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = column.default_value.as_deref().filter(|d| !d.is_empty()) {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }

        column_defs.push(def);
    }

    if !table.primary_key.is_empty() {
        let pk_cols = table
            .primary_key
            .iter()
            .map(|c| quote_mssql(c))
            .collect::<Result<Vec<_>>>()?;
        column_defs.push(format!(
            "    CONSTRAINT {} PRIMARY KEY ({})",
            quote_mssql(&format!("PK_{}", table.table_name))?,
            pk_cols.join(", ")
        ));
    }

    Ok(format!(
        "CREATE TABLE {} (\n{}\n)",
        qualify_mssql(&table.schema_name, &table.table_name)?,
        column_defs.join(",\n")
    ))
}

/// A foreign-key constraint with its column pairs merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyConstraint<'a> {
    pub name: &'a str,
    pub columns: Vec<&'a str>,
    pub referenced_schema: &'a str,
    pub referenced_table: &'a str,
    pub referenced_columns: Vec<&'a str>,
    pub delete_rule: &'a str,
    pub update_rule: &'a str,
}

/// Merge per-column foreign-key entries into constraints, keeping the
/// order in which each constraint first appears.
pub fn group_foreign_keys(foreign_keys: &[ForeignKeyInfo]) -> Vec<ForeignKeyConstraint<'_>> {
    let mut grouped: Vec<ForeignKeyConstraint<'_>> = Vec::new();

    for fk in foreign_keys {
        match grouped.iter_mut().find(|g| g.name == fk.constraint_name) {
            Some(existing) => {
                existing.columns.push(&fk.column_name);
                existing.referenced_columns.push(&fk.referenced_column);
            }
            None => grouped.push(ForeignKeyConstraint {
                name: &fk.constraint_name,
                columns: vec![&fk.column_name],
                referenced_schema: &fk.referenced_schema,
                referenced_table: &fk.referenced_table,
                referenced_columns: vec![&fk.referenced_column],
                delete_rule: &fk.delete_rule,
                update_rule: &fk.update_rule,
            }),
        }
    }

    grouped
}

/// Generate `ALTER TABLE ... ADD CONSTRAINT ... FOREIGN KEY` for one constraint.
pub fn foreign_key_statement(table: &TableInfo, fk: &ForeignKeyConstraint<'_>) -> Result<String> {
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        qualify_mssql(&table.schema_name, &table.table_name)?,
        quote_mssql(fk.name)?,
        quote_list(&fk.columns)?,
        qualify_mssql(fk.referenced_schema, fk.referenced_table)?,
        quote_list(&fk.referenced_columns)?
    );

    if let Some(rule) = referential_action(fk.delete_rule) {
        sql.push_str(" ON DELETE ");
        sql.push_str(&rule);
    }
    if let Some(rule) = referential_action(fk.update_rule) {
        sql.push_str(" ON UPDATE ");
        sql.push_str(&rule);
    }

    Ok(sql)
}

/// One key column of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub descending: bool,
}

/// Generate `CREATE [UNIQUE] INDEX` for a non-primary-key index.
pub fn index_statement(
    schema: &str,
    table: &str,
    index: &str,
    unique: bool,
    columns: &[IndexColumn],
) -> Result<String> {
    let keys = columns
        .iter()
        .map(|c| {
            Ok(format!(
                "{} {}",
                quote_mssql(&c.name)?,
                if c.descending { "DESC" } else { "ASC" }
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "CREATE {}INDEX {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        quote_mssql(index)?,
        qualify_mssql(schema, table)?,
        keys.join(", ")
    ))
}

/// Generate `ALTER TABLE ... ADD CONSTRAINT ... CHECK` from the stored
/// definition, which the server already wraps in parentheses.
pub fn check_constraint_statement(
    schema: &str,
    table: &str,
    constraint: &str,
    definition: &str,
) -> Result<String> {
    Ok(format!(
        "ALTER TABLE {} ADD CONSTRAINT {} CHECK {}",
        qualify_mssql(schema, table)?,
        quote_mssql(constraint)?,
        definition
    ))
}

fn quote_list(cols: &[&str]) -> Result<String> {
    Ok(cols
        .iter()
        .map(|c| quote_mssql(c))
        .collect::<Result<Vec<_>>>()?
        .join(", "))
}

/// `SET_NULL` becomes `SET NULL`; `NO_ACTION` (the server default) is omitted.
fn referential_action(rule: &str) -> Option<String> {
    let rule = rule.trim();
    if rule.is_empty() || rule.eq_ignore_ascii_case("NO_ACTION") {
        None
    } else {
        Some(rule.replace('_', " ").to_uppercase())
    }
}
