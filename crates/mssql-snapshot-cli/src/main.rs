//! mssql-snapshot CLI - export, import and verify SQL Server snapshot archives.

mod prompt;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{ArgGroup, Parser};
use mssql_snapshot::archive::default_archive_name;
use mssql_snapshot::{
    verify_archive, ConnectionConfig, ExportOrchestrator, ImportOrchestrator, MigrateError,
    MssqlConnection,
};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "mssql-snapshot")]
#[command(about = "Export and import SQL Server databases through portable snapshot archives")]
#[command(version)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["export", "import", "verify"])
))]
struct Cli {
    /// Export a database to a snapshot archive
    #[arg(long)]
    export: bool,

    /// Import a snapshot archive into a database
    #[arg(long)]
    import: bool,

    /// Inspect a snapshot archive without connecting to a database
    #[arg(long)]
    verify: bool,

    /// Server host name or address
    #[arg(long)]
    server: Option<String>,

    /// Server port [default: 1433]
    #[arg(long)]
    port: Option<u16>,

    /// Named instance, resolved through the SQL Browser service
    #[arg(long)]
    instance: Option<String>,

    /// Database name
    #[arg(long)]
    database: Option<String>,

    /// SQL login
    #[arg(long)]
    username: Option<String>,

    /// Password for the SQL login
    #[arg(long)]
    password: Option<String>,

    /// Archive path (export default: sqlserver_backup_<db>_<timestamp>.gz)
    #[arg(long)]
    backup_file: Option<PathBuf>,

    /// Encrypt the connection
    #[arg(long)]
    encrypt: bool,

    /// Path to a YAML connection file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    force: bool,

    /// Print the full error chain and debug logs
    #[arg(long)]
    debug: bool,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Export,
    Import,
    Verify,
}

impl Cli {
    fn operation(&self) -> Operation {
        if self.export {
            Operation::Export
        } else if self.import {
            Operation::Import
        } else {
            Operation::Verify
        }
    }

    /// Connection settings from `--config`, overlaid with explicit flags.
    fn connection_config(&self) -> Result<ConnectionConfig, MigrateError> {
        let mut config = match &self.config {
            Some(path) => ConnectionConfig::load(path)?,
            None => ConnectionConfig::default(),
        };

        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(instance) = &self.instance {
            config.instance = Some(instance.clone());
        }
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if self.encrypt {
            config.encrypt = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    let debug = cli.debug;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if debug {
                eprintln!("{}", e.format_detailed());
            } else {
                eprintln!("Error: {}", e);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), MigrateError> {
    let verbosity = if cli.debug { "debug" } else { cli.verbosity.as_str() };
    setup_logging(verbosity, &cli.log_format).map_err(MigrateError::Config)?;

    match cli.operation() {
        Operation::Verify => {
            let path = required_backup_file(&cli, "--verify")?;
            let report = verify_archive(path)?;
            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("{}", report);
            }
            Ok(())
        }
        Operation::Export => {
            let config = cli.connection_config()?;
            let path = cli.backup_file.clone().unwrap_or_else(|| {
                default_archive_name(&config.database, chrono::Local::now().naive_local())
            });

            print_connection_summary("Export", &config, &path);
            if !cli.force && !prompt::confirm("Proceed with export? (SI/NO)")? {
                println!("Operation cancelled");
                return Ok(());
            }

            let mut connection = MssqlConnection::connect(&config).await?;
            let summary = ExportOrchestrator::new(&mut connection).run(&path).await?;

            if cli.output_json {
                println!("{}", summary.to_json()?);
            } else {
                println!(
                    "Exported {} tables ({} rows, {} other objects) to {} ({} bytes) in {:.1}s",
                    summary.tables,
                    summary.total_records,
                    summary.procedural_objects,
                    summary.path.display(),
                    summary.archive_bytes,
                    summary.duration_seconds
                );
            }
            Ok(())
        }
        Operation::Import => {
            let config = cli.connection_config()?;
            let path = required_backup_file(&cli, "--import")?;
            if !path.is_file() {
                return Err(MigrateError::Config(format!(
                    "backup file not found: {}",
                    path.display()
                )));
            }

            print_connection_summary("Import", &config, path);
            if !cli.force && !prompt::confirm("Proceed with import? (SI/NO)")? {
                println!("Operation cancelled");
                return Ok(());
            }

            let mut connection = MssqlConnection::connect(&config).await?;
            let report = ImportOrchestrator::new(&mut connection).run_file(path).await?;

            if cli.output_json {
                println!("{}", report.to_json()?);
            } else {
                println!(
                    "Imported {} tables ({} rows) into {} in {:.1}s",
                    report.tables_created,
                    report.rows_inserted,
                    config.database,
                    report.duration_seconds
                );
                for warning in &report.warnings {
                    println!("Warning [{}] {}: {}", warning.phase, warning.object, warning.message);
                }
            }
            Ok(())
        }
    }
}

fn required_backup_file<'a>(cli: &'a Cli, operation: &str) -> Result<&'a Path, MigrateError> {
    cli.backup_file
        .as_deref()
        .ok_or_else(|| MigrateError::Config(format!("{} requires --backup-file", operation)))
}

fn print_connection_summary(operation: &str, config: &ConnectionConfig, path: &Path) {
    println!("{} settings:", operation);
    println!("  Server:   {}", config.display_address());
    println!("  Database: {}", config.database);
    println!("  Username: {}", config.username);
    println!("  Password: {}", config.masked_password());
    println!("  Archive:  {}", path.display());
    info!("{} of {} on {}", operation, config.database, config.display_address());
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr; stdout carries reports.
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().try_init().map_err(|e| e.to_string())
    } else {
        subscriber.try_init().map_err(|e| e.to_string())
    }
}
