use crate::cli::commands::{store_from, StoreArgs};
use crate::core::config::Config;
use crate::core::validator::IntegrityValidator;
use crate::core::LookupEngine;
use crate::ZctaError;
use clap::{Args, ValueEnum};
use colored::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Five-character ZCTA codes
    #[arg(required = true, value_name = "ZCTA")]
    pub zctas: Vec<String>,

    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Refuse to answer from a store that fails verification
    #[arg(long)]
    pub require_valid: bool,
}

pub fn run(args: LookupArgs, mut config: Config) -> anyhow::Result<()> {
    args.store.apply(&mut config);
    let store = store_from(&config);
    if !store.exists() {
        return Err(ZctaError::Persistence(format!(
            "no store at {}; run `zcta-race build` first",
            store.path().display()
        ))
        .into());
    }

    if args.require_valid {
        IntegrityValidator::new(config.validation).check(&store.open_read_only()?)?;
    }

    let engine = LookupEngine::open(&store)?;
    let results = args
        .zctas
        .iter()
        .map(|zcta| engine.lookup(zcta))
        .collect::<Result<Vec<_>, _>>()?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => {
            for result in &results {
                if result.is_error() {
                    println!("{}", result.to_string().dimmed());
                } else {
                    println!("{}", result);
                }
            }
        }
    }
    Ok(())
}
