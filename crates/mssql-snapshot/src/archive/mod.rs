//! Gzip-compressed JSON archive holding one snapshot document.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::snapshot::Snapshot;

/// Default archive name: `sqlserver_backup_<db>_<YYYYMMDD_HHMMSS>.gz`.
pub fn default_archive_name(database: &str, at: NaiveDateTime) -> PathBuf {
    PathBuf::from(format!(
        "sqlserver_backup_{}_{}.gz",
        database,
        at.format("%Y%m%d_%H%M%S")
    ))
}

/// Write `snapshot` to `path`.
///
/// The archive is written to `<path>.tmp` and renamed into place once
/// complete, so a failed write never leaves a partial archive at `path`.
/// Returns the compressed size in bytes.
pub fn write_snapshot<P: AsRef<Path>>(path: P, snapshot: &Snapshot) -> Result<u64> {
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    let written = write_compressed(&temp_path, snapshot).and_then(|()| {
        std::fs::rename(&temp_path, path)?;
        Ok(std::fs::metadata(path)?.len())
    });

    if written.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    let size = written?;

    debug!("Wrote archive {} ({} bytes)", path.display(), size);
    Ok(size)
}

fn write_compressed(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, snapshot)?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| MigrateError::Io(e.into_error()))?
        .sync_all()?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Read and parse the snapshot stored at `path`.
///
/// A missing file is an IO error; anything wrong with the bytes themselves
/// (not gzip, truncated, not a snapshot document) is an archive format error.
pub fn read_snapshot<P: AsRef<Path>>(path: P) -> Result<Snapshot> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(GzDecoder::new(BufReader::new(file)));

    serde_json::from_reader(reader).map_err(|e| {
        MigrateError::ArchiveFormat(format!("{}: {}", path.display(), e))
    })
}
