//! Default locations. These only seed [`Config::default`](crate::core::Config);
//! every component receives its paths explicitly from the config.

use std::path::PathBuf;
use std::sync::OnceLock;

static ZCTA_RACE_HOME: OnceLock<PathBuf> = OnceLock::new();

/// Get the home directory
/// Checks ZCTA_RACE_HOME environment variable, falls back to ${HOME}/.zcta-race
pub fn zcta_race_home() -> PathBuf {
    ZCTA_RACE_HOME
        .get_or_init(|| {
            if let Ok(path) = std::env::var("ZCTA_RACE_HOME") {
                PathBuf::from(path)
            } else {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".zcta-race")
            }
        })
        .clone()
}

/// Default location of the persisted store
pub fn default_store_path() -> PathBuf {
    zcta_race_home().join("zcta-race.sqlite")
}

/// Default scratch directory for downloaded and decompressed files
pub fn default_scratch_dir() -> PathBuf {
    zcta_race_home().join("scratch")
}

/// Default config file, read when no `--config` is given and it exists
pub fn default_config_path() -> PathBuf {
    zcta_race_home().join("config.toml")
}

/// Check if running with a custom home directory
pub fn is_custom_home() -> bool {
    std::env::var("ZCTA_RACE_HOME").is_ok()
}
