//! Identifier validation and quoting for generated SQL Server statements.
//!
//! SQL identifiers (schema, table, column and constraint names) cannot be
//! passed as query parameters, so every statement this crate builds embeds
//! them quoted. Names are validated first (no NUL byte, at most 128 characters)
//! and then bracket-quoted with `]` escaped as `]]`.

use crate::error::{MigrateError, Result};

/// Maximum identifier length accepted by SQL Server (`sysname`), in characters.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers containing null bytes (injection vector)
/// - Identifiers exceeding maximum length
///
/// # Errors
///
/// Returns `MigrateError::Config` for invalid identifiers with a descriptive message.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    let length = name.chars().count();
    if length > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} characters (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH, length, name
        )));
    }

    Ok(())
}

/// Quote a SQL Server identifier using brackets.
///
/// ```ignore
/// assert_eq!(quote_mssql("users")?, "[users]");
/// assert_eq!(quote_mssql("table]name")?, "[table]]name]");
/// ```
pub fn quote_mssql(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", name.replace(']', "]]")))
}

/// Qualify a SQL Server table name with schema.
///
/// Returns `[schema].[table]` with proper quoting.
pub fn qualify_mssql(schema: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_mssql(schema)?, quote_mssql(table)?))
}

/// Split a `schema.table` name at the first dot.
///
/// Names without a dot are placed in `dbo`.
pub fn split_qualified(name: &str) -> (&str, &str) {
    match name.split_once('.') {
        Some((schema, table)) => (schema, table),
        None => ("dbo", name),
    }
}

/// Quote a `schema.table` name as `[schema].[table]`.
pub fn quote_qualified(name: &str) -> Result<String> {
    let (schema, table) = split_qualified(name);
    qualify_mssql(schema, table)
}
