//! Scoped scratch directory for one build run.
//!
//! The directory is removed and recreated on acquisition and again on drop,
//! so archives and extracted files never outlive the build that fetched them.
use crate::{Result, ZctaError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

const METADATA_FILE: &str = "workspace.json";
const DOWNLOADS_DIR: &str = "downloads";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub scratch_root: PathBuf,
    /// Move the scratch tree aside instead of wiping it when the run fails
    pub preserve_on_failure: bool,
}

impl WorkspaceConfig {
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            preserve_on_failure: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkspaceStatus {
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMetadata {
    pub id: String,
    pub created_at: u64,
    pub command: String,
    pub status: WorkspaceStatus,
    pub error_message: Option<String>,
}

#[derive(Debug)]
pub struct ScratchWorkspace {
    root: PathBuf,
    config: WorkspaceConfig,
    metadata: WorkspaceMetadata,
    released: bool,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn reset_dir(path: &Path) -> std::io::Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)
}

impl ScratchWorkspace {
    /// Take ownership of the scratch directory, clearing anything left behind
    pub fn acquire(command: &str, config: WorkspaceConfig) -> Result<Self> {
        let root = config.scratch_root.clone();
        reset_dir(&root).map_err(|e| {
            ZctaError::Io(std::io::Error::new(
                e.kind(),
                format!("cannot prepare scratch directory {}: {}", root.display(), e),
            ))
        })?;
        fs::create_dir_all(root.join(DOWNLOADS_DIR))?;

        let created_at = unix_now();
        let metadata = WorkspaceMetadata {
            id: format!("{}_{}", created_at, Uuid::new_v4()),
            created_at,
            command: command.to_string(),
            status: WorkspaceStatus::Active,
            error_message: None,
        };

        let workspace = Self {
            root,
            config,
            metadata,
            released: false,
        };
        workspace.save_metadata()?;
        debug!(path = %workspace.root.display(), "Scratch workspace acquired");
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory fetched archives land in
    pub fn downloads(&self) -> PathBuf {
        self.root.join(DOWNLOADS_DIR)
    }

    pub fn metadata(&self) -> &WorkspaceMetadata {
        &self.metadata
    }

    fn save_metadata(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.metadata)
            .map_err(|e| ZctaError::Persistence(format!("workspace metadata: {}", e)))?;
        fs::write(self.root.join(METADATA_FILE), json)?;
        Ok(())
    }

    pub fn mark_failed(&mut self, error: &str) -> Result<()> {
        self.metadata.status = WorkspaceStatus::Failed;
        self.metadata.error_message = Some(error.to_string());
        self.save_metadata()
    }

    pub fn mark_completed(&mut self) -> Result<()> {
        self.metadata.status = WorkspaceStatus::Completed;
        self.save_metadata()
    }

    /// Release the directory: wipe it, or set it aside when the run failed and
    /// preservation is on. Returns the preserved location, if any.
    pub fn release(mut self) -> Result<Option<PathBuf>> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> Result<Option<PathBuf>> {
        if self.released {
            return Ok(None);
        }
        self.released = true;

        let failed = self.metadata.status != WorkspaceStatus::Completed;
        let mut preserved = None;
        if failed && self.config.preserve_on_failure && self.root.exists() {
            let name = self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "scratch".to_string());
            let target = self
                .root
                .with_file_name(format!("{}-failed-{}", name, self.metadata.id));
            // Failing to set the tree aside must not stop the reset below
            match fs::rename(&self.root, &target) {
                Ok(()) => {
                    warn!(path = %target.display(), "Scratch workspace preserved after failure");
                    preserved = Some(target);
                }
                Err(e) => warn!(
                    "Could not preserve scratch workspace at {}: {}",
                    target.display(),
                    e
                ),
            }
        }

        reset_dir(&self.root)?;
        debug!(path = %self.root.display(), "Scratch workspace released");
        Ok(preserved)
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to clean scratch workspace {}: {}", self.root.display(), e);
        }
    }
}
