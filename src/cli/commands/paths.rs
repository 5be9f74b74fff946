use crate::cli::commands::store_from;
use crate::cli::output::*;
use crate::core::config::Config;
use crate::core::paths;
use clap::Args;

#[derive(Args)]
pub struct PathsArgs {
    /// Also print the effective configuration as TOML
    #[arg(long)]
    pub show_config: bool,
}

pub fn run(args: PathsArgs, config: Config) -> anyhow::Result<()> {
    let store = store_from(&config);
    let home = paths::zcta_race_home();
    let config_path = paths::default_config_path();

    section_header("Paths");
    tree(&[
        (
            "Home",
            format!(
                "{}{}",
                home.display(),
                if paths::is_custom_home() { " (ZCTA_RACE_HOME)" } else { "" }
            ),
        ),
        (
            "Config",
            format!(
                "{}{}",
                config_path.display(),
                if config_path.exists() { "" } else { " (not present)" }
            ),
        ),
        (
            "Store",
            format!(
                "{}{}",
                store.path().display(),
                if store.exists() { "" } else { " (not built)" }
            ),
        ),
        ("Staging", store.staging_path().display().to_string()),
        ("Scratch", config.store.scratch_path.display().to_string()),
        (
            "Source",
            match &config.source.local_mirror {
                Some(mirror) => mirror.display().to_string(),
                None => format!("{}{}", config.source.base_url, config.source.base_path),
            },
        ),
    ]);

    if args.show_config {
        section_header("Configuration");
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}
