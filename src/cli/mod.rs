pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "zcta-race",
    version,
    about = "Racial composition by ZIP Code Tabulation Area from Census 2000 SF1",
    long_about = "zcta-race downloads the Census 2000 Summary File 1 geographic header and \
                  population table for every state, loads them into a local SQLite store, \
                  and answers per-ZCTA racial composition lookups against it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Fetch and extraction workers, overriding source.workers (0 = all CPUs)
    #[arg(short = 'j', long, global = true)]
    pub threads: Option<usize>,

    /// Configuration file (defaults to <home>/config.toml when present)
    #[arg(long, value_name = "FILE", env = "ZCTA_RACE_CONFIG", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the census files and rebuild the store
    Build(commands::build::BuildArgs),

    /// Check the store against the expected dataset row counts
    Verify(commands::verify::VerifyArgs),

    /// Racial composition of one or more ZCTAs
    Lookup(commands::lookup::LookupArgs),

    /// Drop the geocode tables from the store
    Destroy(commands::destroy::DestroyArgs),

    /// Show resolved paths and configuration
    Paths(commands::paths::PathsArgs),
}
