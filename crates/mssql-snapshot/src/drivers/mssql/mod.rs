//! Microsoft SQL Server driver.
//!
//! One [`MssqlConnection`] wraps one Tiberius client. It implements
//! [`CatalogReader`](crate::core::traits::CatalogReader) for export (see
//! `reader`) and [`ReplayTarget`](crate::core::traits::ReplayTarget) for
//! import (see `writer`). Every call is awaited to completion before the
//! next one is issued.

mod reader;
mod writer;

use tiberius::{AuthMethod, Client, Config, EncryptionLevel, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{MigrateError, Result};

/// Maximum TDS packet size (32767 bytes, ~32KB).
const TDS_MAX_PACKET_SIZE: u32 = 32767;

const APPLICATION_NAME: &str = "mssql-snapshot";

/// A single open connection to a SQL Server database.
pub struct MssqlConnection {
    client: Client<Compat<TcpStream>>,
}

impl MssqlConnection {
    /// Validate `config` and connect.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;
        let target = config.display_address();
        let tds = build_config(config);

        let tcp = match config.instance {
            Some(_) => TcpStream::connect_named(&tds)
                .await
                .map_err(|e| MigrateError::connectivity(&target, e))?,
            None => TcpStream::connect(tds.get_addr())
                .await
                .map_err(|e| MigrateError::connectivity(&target, e))?,
        };
        tcp.set_nodelay(true).ok();

        let client = Client::connect(tds, tcp.compat_write())
            .await
            .map_err(|e| MigrateError::connectivity(&target, e))?;

        info!("Connected to {} (database {})", target, config.database);
        Ok(Self { client })
    }

    /// Run a statement batch and discard any result sets.
    async fn batch(&mut self, sql: &str) -> std::result::Result<(), tiberius::error::Error> {
        debug!("Executing: {}", first_line(sql));
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

fn build_config(config: &ConnectionConfig) -> Config {
    let mut tds = Config::new();
    tds.host(&config.server);
    tds.port(config.port);
    if let Some(instance) = &config.instance {
        tds.instance_name(instance);
    }
    tds.database(&config.database);
    tds.application_name(APPLICATION_NAME);
    tds.authentication(AuthMethod::sql_server(
        &config.username,
        config.password.as_deref().unwrap_or_default(),
    ));

    // Encryption settings
    if config.encrypt {
        if config.trust_server_cert {
            tds.trust_cert();
        }
        tds.encryption(EncryptionLevel::Required);
    } else {
        tds.encryption(EncryptionLevel::NotSupported);
    }

    tds.packet_size(TDS_MAX_PACKET_SIZE);
    tds
}

fn first_line(sql: &str) -> &str {
    sql.trim_start().lines().next().unwrap_or_default()
}
