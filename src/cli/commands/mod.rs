pub mod build;
pub mod destroy;
pub mod lookup;
pub mod paths;
pub mod verify;

use crate::core::config::{self, Config};
use crate::core::paths as home;
use crate::storage::Store;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Store location overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Store file (overrides store.store_path)
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,
}

impl StoreArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(store) = &self.store {
            config.store.store_path = store.clone();
        }
    }
}

/// Load the configuration: an explicit file, else `<home>/config.toml` when
/// it exists, else built-in defaults
pub fn resolve_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit {
        Some(path) => {
            debug!("Loading config from {}", path.display());
            config::load_config(path)?
        }
        None => {
            let path = home::default_config_path();
            if path.exists() {
                debug!("Loading config from {}", path.display());
                config::load_config(&path)?
            } else {
                config::default_config()
            }
        }
    };
    Ok(config)
}

/// `-j` sizes the worker pool used for fetching and extraction
pub fn apply_threads(config: &mut Config, threads: Option<usize>) {
    if let Some(threads) = threads {
        config.source.workers = threads;
    }
}

pub fn store_from(config: &Config) -> Store {
    Store::new(&config.store.store_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_threads_flag_sizes_worker_pool() {
        let cli = Cli::try_parse_from(["zcta-race", "-j", "7", "verify"]).unwrap();
        let mut config = Config::default();
        apply_threads(&mut config, cli.threads);
        assert_eq!(config.source.workers, 7);
        assert_eq!(config.source.effective_workers(), 7);
        assert!(matches!(cli.command, Commands::Verify(_)));
    }

    #[test]
    fn test_absent_threads_flag_keeps_configured_workers() {
        let cli = Cli::try_parse_from(["zcta-race", "verify"]).unwrap();
        let mut config = Config::default();
        config.source.workers = 3;
        apply_threads(&mut config, cli.threads);
        assert_eq!(config.source.workers, 3);
    }

    #[test]
    fn test_build_workers_flag_wins_over_global_threads() {
        let cli = Cli::try_parse_from(["zcta-race", "-j", "2", "build", "--workers", "5"]).unwrap();
        let mut config = Config::default();
        apply_threads(&mut config, cli.threads);
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        args.apply(&mut config);
        assert_eq!(config.source.workers, 5);
    }
}
