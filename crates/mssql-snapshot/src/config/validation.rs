//! Configuration validation.

use super::ConnectionConfig;
use crate::core::identifier::validate_identifier;
use crate::error::{MigrateError, Result};

/// Validate the connection configuration.
///
/// Runs before any connection attempt so bad parameters fail fast.
pub fn validate(config: &ConnectionConfig) -> Result<()> {
    if config.server.trim().is_empty() {
        return Err(MigrateError::Config("server is required".into()));
    }
    if config.database.trim().is_empty() {
        return Err(MigrateError::Config("database is required".into()));
    }
    if config.username.trim().is_empty() {
        return Err(MigrateError::Config("username is required".into()));
    }
    if config.password.is_none() {
        return Err(MigrateError::Config("password is required".into()));
    }
    if config.port == 0 {
        return Err(MigrateError::Config(
            "port must be between 1 and 65535".into(),
        ));
    }

    validate_identifier(&config.database)?;
    if let Some(instance) = &config.instance {
        if instance.trim().is_empty() {
            return Err(MigrateError::Config("instance cannot be blank".into()));
        }
    }

    Ok(())
}
