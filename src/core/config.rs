use crate::core::paths;
use crate::core::validator::ExpectedCounts;
use crate::ZctaError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub source: SourceConfig,
    pub validation: ExpectedCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Location of the persisted store
    pub store_path: PathBuf,
    /// Location of transient downloaded and decompressed files
    pub scratch_path: PathBuf,
    /// Keep the scratch files of a failed build for inspection
    pub preserve_scratch_on_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    /// Directory under `base_url` listing one subdirectory per state
    pub base_path: String,
    /// First state directory in the listing; earlier entries are ignored
    pub first_state: String,
    pub timeout_secs: u64,
    /// Concurrent fetch and extraction workers (0 = number of CPUs)
    pub workers: usize,
    /// Abort the build when a state lacks one of its two files
    pub strict: bool,
    /// Read the state tree from a local directory instead of `base_url`
    pub local_mirror: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_path: paths::default_store_path(),
            scratch_path: paths::default_scratch_dir(),
            preserve_scratch_on_failure: std::env::var("ZCTA_RACE_PRESERVE_SCRATCH").is_ok(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www2.census.gov/".to_string(),
            base_path: "census_2000/datasets/Summary_File_1".to_string(),
            first_state: "Alabama".to_string(),
            timeout_secs: 300,
            workers: 4,
            strict: false,
            local_mirror: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            source: SourceConfig::default(),
            validation: ExpectedCounts::default(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

impl Config {
    /// Reject configurations a build would misbehave under
    pub fn validate(&self) -> Result<(), ZctaError> {
        if self.store.scratch_path.as_os_str().is_empty() {
            return Err(ZctaError::Config("scratch_path must not be empty".to_string()));
        }
        // The scratch directory is wiped on every build, so nothing that must
        // survive a build may live under it, whatever spelling reaches it
        let scratch = resolve_path(&self.store.scratch_path);
        let store = resolve_path(&self.store.store_path);
        if store.starts_with(&scratch) {
            return Err(ZctaError::Config(format!(
                "store_path {} lies inside scratch_path {}",
                self.store.store_path.display(),
                self.store.scratch_path.display()
            )));
        }
        let config_file = paths::default_config_path();
        if resolve_path(&config_file).starts_with(&scratch) {
            return Err(ZctaError::Config(format!(
                "config file {} lies inside scratch_path {}",
                config_file.display(),
                self.store.scratch_path.display()
            )));
        }
        if self.source.timeout_secs == 0 {
            return Err(ZctaError::Config("timeout_secs must be positive".to_string()));
        }
        if self.source.first_state.trim().is_empty() {
            return Err(ZctaError::Config("first_state must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Collapse `.` and `..` without touching the filesystem
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.push(component);
                } else {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Absolute form of `path` with symlinks resolved through its deepest
/// existing ancestor. The part that does not exist yet is appended as written.
pub(crate) fn resolve_path(path: &Path) -> PathBuf {
    let mut current = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut missing: Vec<OsString> = Vec::new();

    let base = loop {
        if let Ok(canonical) = current.canonicalize() {
            break canonical;
        }
        match current.file_name() {
            Some(name) => {
                missing.push(name.to_os_string());
                current.pop();
            }
            None => {
                // Ends in `..` below a missing directory, or nothing exists at all
                let collapsed = lexical_normalize(&current);
                if collapsed == current {
                    break current;
                }
                current = collapsed;
            }
        }
    };
    missing.iter().rev().fold(base, |acc, name| acc.join(name))
}

pub fn default_config() -> Config {
    Config::default()
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ZctaError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| ZctaError::Config(format!("Failed to parse config: {}", e)))?;
    config.validate()?;
    Ok(config)
}

pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<(), ZctaError> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| ZctaError::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.store.store_path = dir.path().join("store.sqlite");
        config.store.scratch_path = dir.path().join("scratch");
        config.source.local_mirror = Some(dir.path().join("mirror"));
        config.validation = ExpectedCounts {
            geographic_rows: 2,
            race_rows: 5,
        };

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[source]\nworkers = 8\n\n[store]\nstore_path = \"/data/zcta.sqlite\"\nscratch_path = \"/tmp/zcta-scratch\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.source.workers, 8);
        assert_eq!(config.source.first_state, "Alabama");
        assert_eq!(config.store.store_path, PathBuf::from("/data/zcta.sqlite"));
        assert_eq!(config.validation, ExpectedCounts::default());
    }

    #[test]
    fn test_store_inside_scratch_is_rejected() {
        let mut config = Config::default();
        config.store.scratch_path = PathBuf::from("/tmp/work");
        config.store.store_path = PathBuf::from("/tmp/work/store.sqlite");
        assert!(matches!(config.validate(), Err(ZctaError::Config(_))));
    }

    #[test]
    fn test_store_reached_through_parent_alias_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.store_path = dir.path().join("work").join("zcta.sqlite");
        config.store.scratch_path = dir.path().join("other").join("..").join("work");
        assert!(matches!(config.validate(), Err(ZctaError::Config(_))));

        std::fs::create_dir_all(dir.path().join("other")).unwrap();
        std::fs::create_dir_all(dir.path().join("work")).unwrap();
        assert!(matches!(config.validate(), Err(ZctaError::Config(_))));
    }

    #[test]
    fn test_scratch_above_store_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.store_path = dir.path().join("data").join("zcta.sqlite");
        config.store.scratch_path = dir.path().to_path_buf();
        assert!(matches!(config.validate(), Err(ZctaError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_store_reached_through_symlink_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        std::os::unix::fs::symlink(&work, dir.path().join("alias")).unwrap();

        let mut config = Config::default();
        config.store.store_path = work.join("zcta.sqlite");
        config.store.scratch_path = dir.path().join("alias");
        assert!(matches!(config.validate(), Err(ZctaError::Config(_))));
    }

    #[test]
    fn test_sibling_directories_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.store_path = dir.path().join("work").join("zcta.sqlite");
        config.store.scratch_path = dir.path().join("work-scratch");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_path_collapses_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        assert_eq!(
            resolve_path(&dir.path().join("a").join("..").join("b").join("c")),
            base.join("b").join("c")
        );
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[source\nworkers = ").unwrap();
        assert!(matches!(load_config(&path), Err(ZctaError::Config(_))));
    }

    #[test]
    fn test_zero_workers_means_all_cpus() {
        let mut source = SourceConfig::default();
        source.workers = 0;
        assert_eq!(source.effective_workers(), num_cpus::get());
    }
}
