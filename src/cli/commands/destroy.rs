use crate::cli::commands::{store_from, StoreArgs};
use crate::cli::output::*;
use crate::core::config::Config;
use crate::storage::GEOCODE_MODEL;
use clap::Args;

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Confirm dropping the tables
    #[arg(long)]
    pub yes: bool,
}

pub fn run(args: DestroyArgs, mut config: Config) -> anyhow::Result<()> {
    args.store.apply(&mut config);
    let store = store_from(&config);

    if !args.yes {
        anyhow::bail!(
            "refusing to drop {} tables from {} without --yes",
            GEOCODE_MODEL.name,
            store.path().display()
        );
    }

    let dropped = store.destroy_model(&GEOCODE_MODEL)?;
    if dropped.is_empty() {
        info("Nothing to drop");
    } else {
        for table in &dropped {
            success(&format!("Dropped {}", table));
        }
    }
    Ok(())
}
