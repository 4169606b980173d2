//! Connection configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

impl ConnectionConfig {
    /// Load configuration from a YAML file.
    ///
    /// The result is not validated: callers overlay command-line values first
    /// and then call [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ConnectionConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Server address for operator output, e.g. `db01\SQLEXPRESS:1433`.
    pub fn display_address(&self) -> String {
        match &self.instance {
            Some(instance) => format!("{}\\{}:{}", self.server, instance, self.port),
            None => format!("{}:{}", self.server, self.port),
        }
    }

    /// Password with everything but the first and last character hidden.
    pub fn masked_password(&self) -> String {
        let password = self.password.as_deref().unwrap_or_default();
        let chars: Vec<char> = password.chars().collect();
        match chars.len() {
            0 => String::new(),
            n if n <= 2 => "*".repeat(n),
            n => format!("{}{}{}", chars[0], "*".repeat(n - 2), chars[n - 1]),
        }
    }
}
