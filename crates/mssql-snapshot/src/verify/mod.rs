//! Offline archive inspection.
//!
//! Verification never touches a database: it parses the archive, summarizes
//! what it holds and flags structural inconsistencies. Inconsistencies are
//! reported as warnings; only an unreadable archive fails.

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use crate::archive;
use crate::error::Result;
use crate::snapshot::{ProceduralKind, Snapshot};

/// Summary of one archive.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub export_date: NaiveDateTime,
    pub database_name: String,
    pub sql_server_version: String,
    pub format_version: String,
    pub tables: usize,
    pub total_records: u64,
    pub procedures: usize,
    pub functions: usize,
    pub views: usize,
    pub triggers: usize,
    pub indexes: usize,
    pub check_constraints: usize,

    /// Structural problems found in the document.
    pub warnings: Vec<String>,
}

impl VerifyReport {
    /// Summarize `snapshot` and check it for structural consistency.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let count = |kind: ProceduralKind| snapshot.procedural(kind).len();

        Self {
            export_date: snapshot.metadata.export_date,
            database_name: snapshot.metadata.database_name.clone(),
            sql_server_version: snapshot.metadata.sql_server_version.clone(),
            format_version: snapshot.metadata.version.clone(),
            tables: snapshot.tables.len(),
            total_records: snapshot.total_rows(),
            procedures: count(ProceduralKind::Procedure),
            functions: count(ProceduralKind::Function),
            views: count(ProceduralKind::View),
            triggers: count(ProceduralKind::Trigger),
            indexes: count(ProceduralKind::Index),
            check_constraints: count(ProceduralKind::CheckConstraint),
            warnings: structural_warnings(snapshot),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Export date:        {}", self.export_date.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Database:           {}", self.database_name)?;
        writeln!(f, "Server version:     {}", first_line(&self.sql_server_version))?;
        writeln!(f, "Format version:     {}", self.format_version)?;
        writeln!(f, "Tables:             {}", self.tables)?;
        writeln!(f, "Total records:      {}", self.total_records)?;
        writeln!(f, "Stored procedures:  {}", self.procedures)?;
        writeln!(f, "Functions:          {}", self.functions)?;
        writeln!(f, "Views:              {}", self.views)?;
        writeln!(f, "Triggers:           {}", self.triggers)?;
        writeln!(f, "Indexes:            {}", self.indexes)?;
        write!(f, "Check constraints:  {}", self.check_constraints)?;
        for warning in &self.warnings {
            write!(f, "\nWarning: {}", warning)?;
        }
        Ok(())
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default().trim()
}

fn structural_warnings(snapshot: &Snapshot) -> Vec<String> {
    let mut warnings = Vec::new();

    for name in &snapshot.table_order {
        if !snapshot.tables.contains_key(name) {
            warnings.push(format!("table_order lists unknown table {}", name));
        }
    }

    for (name, table) in &snapshot.tables {
        if !snapshot.table_order.contains(name) {
            warnings.push(format!("table {} is missing from table_order", name));
        }

        let captured = snapshot.data.get(name).map_or(0, Vec::len) as i64;
        if captured != table.row_count {
            warnings.push(format!(
                "table {} declares {} rows but holds {}",
                name, table.row_count, captured
            ));
        }

        for fk in &table.foreign_keys {
            let referenced = fk.referenced_full_name();
            if !snapshot.tables.contains_key(&referenced) {
                warnings.push(format!(
                    "foreign key {} on {} references {} which is not in the archive",
                    fk.constraint_name, name, referenced
                ));
            }
        }
    }

    for name in snapshot.data.keys() {
        if !snapshot.tables.contains_key(name) {
            warnings.push(format!("data present for unknown table {}", name));
        }
    }

    warnings
}

/// Read the archive at `path` and report on it.
pub fn verify_archive(path: &Path) -> Result<VerifyReport> {
    info!("Verifying archive {}", path.display());
    let snapshot = archive::read_snapshot(path)?;
    let report = VerifyReport::from_snapshot(&snapshot);

    for warning in &report.warnings {
        warn!("{}", warning);
    }
    info!(
        "Archive holds {} tables and {} rows",
        report.tables, report.total_records
    );
    Ok(report)
}
