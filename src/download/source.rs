use crate::{Result, ZctaError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A published directory tree: one subdirectory per state, each holding that
/// state's archives.
pub trait RemoteSource: Send + Sync {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    /// Entries of the base directory, in listing order
    fn list_states(&self) -> Result<Vec<String>>;

    /// Filenames inside one state directory
    fn list_files(&self, state: &str) -> Result<Vec<String>>;

    /// Copy one remote file to `dest`, returning the bytes written
    fn fetch(&self, state: &str, filename: &str, dest: &Path) -> Result<u64>;
}

/// A copy of the published tree on local disk
#[derive(Debug, Clone)]
pub struct LocalMirrorSource {
    root: PathBuf,
}

impl LocalMirrorSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn sorted_entries(dir: &Path, want_dirs: bool) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() != want_dirs {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

impl RemoteSource for LocalMirrorSource {
    fn describe(&self) -> String {
        format!("local mirror {}", self.root.display())
    }

    fn list_states(&self) -> Result<Vec<String>> {
        Self::sorted_entries(&self.root, true).map_err(|e| {
            ZctaError::SourceUnavailable(format!("{}: {}", self.root.display(), e))
        })
    }

    fn list_files(&self, state: &str) -> Result<Vec<String>> {
        let dir = self.root.join(state);
        Self::sorted_entries(&dir, false).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ZctaError::MissingExpectedFile(format!("state directory {}", dir.display()))
            }
            _ => ZctaError::SourceUnavailable(format!("{}: {}", dir.display(), e)),
        })
    }

    fn fetch(&self, state: &str, filename: &str, dest: &Path) -> Result<u64> {
        let src = self.root.join(state).join(filename);
        fs::copy(&src, dest).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ZctaError::MissingExpectedFile(src.display().to_string())
            }
            _ => ZctaError::Io(e),
        })
    }
}
