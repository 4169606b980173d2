//! Error types for the snapshot library.

use thiserror::Error;

/// Underlying cause carried by step-level errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for export, import and verify operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (missing connection parameters, bad YAML values, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection to the server could not be established
    #[error("Connection to {target} failed: {source}")]
    Connectivity {
        target: String,
        #[source]
        source: BoxError,
    },

    /// An introspection or data-read query failed
    #[error("Catalog read failed ({query}): {source}")]
    CatalogRead {
        query: String,
        #[source]
        source: BoxError,
    },

    /// A fatal replay step failed during import
    #[error("Import failed at {object}: {source}")]
    Replay {
        object: String,
        #[source]
        source: BoxError,
    },

    /// Archive could not be read or its document is malformed
    #[error("Invalid archive: {0}")]
    ArchiveFormat(String),

    /// Driver error not attributed to a specific step
    #[error("SQL Server error: {0}")]
    Source(#[from] tiberius::error::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a Connectivity error for the given server address.
    pub fn connectivity(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::Connectivity {
            target: target.into(),
            source: source.into(),
        }
    }

    /// Create a CatalogRead error describing which read failed.
    pub fn catalog(query: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::CatalogRead {
            query: query.into(),
            source: source.into(),
        }
    }

    /// Create a fatal Replay error for a named object.
    pub fn replay(object: impl Into<String>, source: impl Into<BoxError>) -> Self {
        MigrateError::Replay {
            object: object.into(),
            source: source.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        // Add error chain for wrapped errors
        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
