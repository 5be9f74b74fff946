use clap::Parser;
use colored::*;
use std::process;
use tracing_subscriber::EnvFilter;
use zcta_race::cli::{commands, Cli, Commands};
use zcta_race::ZctaError;

fn main() {
    // ZCTA_RACE_LOG wins over RUST_LOG
    let filter = std::env::var("ZCTA_RACE_LOG")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = match e.downcast_ref::<ZctaError>() {
            Some(ZctaError::Config(_)) => 2,
            Some(ZctaError::Io(_)) => 3,
            Some(ZctaError::Parse(_)) => 4,
            Some(ZctaError::Persistence(_)) => 5,
            Some(ZctaError::SourceUnavailable(_))
            | Some(ZctaError::MissingExpectedFile(_))
            | Some(ZctaError::CorruptArchive(_)) => 6,
            Some(ZctaError::ValidationFailed(_)) => 7,
            None => 1,
        };
        process::exit(exit_code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = commands::resolve_config(cli.config.as_deref())?;
    commands::apply_threads(&mut config, cli.threads);

    if cli.verbose > 0 {
        eprintln!("Using {} workers", config.source.effective_workers());
    }

    match cli.command {
        Commands::Build(args) => commands::build::run(args, config),
        Commands::Verify(args) => commands::verify::run(args, config),
        Commands::Lookup(args) => commands::lookup::run(args, config),
        Commands::Destroy(args) => commands::destroy::run(args, config),
        Commands::Paths(args) => commands::paths::run(args, config),
    }
}
