//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL Server connection configuration.
///
/// Every field can come from a YAML file; the CLI overlays its flags on top,
/// so all fields deserialize with defaults and [`validate`](Self::validate)
/// decides what is actually missing.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host name or address.
    #[serde(default)]
    pub server: String,

    /// TCP port (default: 1433). Ignored when `instance` is set.
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Named instance, resolved through the SQL Browser service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// SQL login.
    #[serde(default)]
    pub username: String,

    /// Password. `None` means it was never supplied; an empty password is allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Encrypt the TDS connection (default: false).
    #[serde(default)]
    pub encrypt: bool,

    /// Trust the server certificate without validation (default: true).
    #[serde(default = "default_true")]
    pub trust_server_cert: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: default_mssql_port(),
            instance: None,
            database: String::new(),
            username: String::new(),
            password: None,
            encrypt: false,
            trust_server_cert: default_true(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("instance", &self.instance)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

fn default_mssql_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}
