use crate::storage::schema::{self, ModelSpec};
use crate::Result;
use rusqlite::{Connection, OpenFlags};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Handle on the persisted store file.
///
/// Builds never write to the live file: they load a sibling staging file and
/// rename it into place, so readers see either the old store or the new one.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read-only connection for lookups and validation
    pub fn open_read_only(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    /// Read-write connection on the live store, created if missing
    pub fn open_read_write(&self) -> Result<Connection> {
        ensure_parent(&self.path)?;
        Ok(Connection::open(&self.path)?)
    }

    pub fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".partial");
        self.path.with_file_name(name)
    }

    /// Fresh, empty staging database for a build
    pub fn create_staging(&self) -> Result<Connection> {
        let staging = self.staging_path();
        ensure_parent(&staging)?;
        if staging.exists() {
            warn!("Removing leftover staging file {}", staging.display());
            fs::remove_file(&staging)?;
        }
        let conn = Connection::open(&staging)?;
        // The file is discarded if the build does not finish
        conn.pragma_update(None, "synchronous", "OFF")?;
        Ok(conn)
    }

    /// Atomically replace the live store with the finished staging file.
    /// The staging connection must be closed first.
    ///
    /// Staging runs with `synchronous=OFF`, so the file is flushed to disk
    /// before the rename and the directory entry is flushed after it.
    pub fn promote_staging(&self) -> Result<()> {
        let staging = self.staging_path();
        File::open(&staging)?.sync_all()?;
        fs::rename(&staging, &self.path)?;
        sync_parent(&self.path)?;
        info!("Store installed at {}", self.path.display());
        Ok(())
    }

    pub fn discard_staging(&self) {
        let staging = self.staging_path();
        if staging.exists() {
            if let Err(e) = fs::remove_file(&staging) {
                warn!("Failed to remove staging file {}: {}", staging.display(), e);
            }
        }
    }

    /// Drop the tables (and their indexes) owned by `model`. Returns the
    /// names actually dropped.
    pub fn destroy_model(&self, model: &ModelSpec) -> Result<Vec<String>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let mut conn = self.open_read_write()?;
        let tx = conn.transaction()?;
        let mut dropped = Vec::new();
        for table in model.tables {
            if schema::table_exists(&tx, table.name)? {
                tx.execute(&format!("DROP TABLE {}", table.name), [])?;
                debug!(table = table.name, model = model.name, "Dropped table");
                dropped.push(table.name.to_string());
            }
        }
        tx.commit()?;
        info!(model = model.name, tables = dropped.len(), "Model destroyed");
        Ok(dropped)
    }
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all()?,
        _ => File::open(".")?.sync_all()?,
    }
    Ok(())
}

// Directory handles cannot be opened for syncing here
#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> Result<()> {
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
