use crate::cli::commands::{store_from, StoreArgs};
use crate::cli::output::*;
use crate::core::config::Config;
use crate::core::validator::IntegrityValidator;
use crate::core::Pipeline;
use crate::download::source_from_config;
use clap::Args;
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Scratch directory for downloads (overrides store.scratch_path)
    #[arg(long, value_name = "DIR")]
    pub scratch: Option<PathBuf>,

    /// Read state directories from a local mirror instead of the census site
    #[arg(long, value_name = "DIR")]
    pub mirror: Option<PathBuf>,

    /// Concurrent fetch/extract workers (0 = all CPUs)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Fail when a state is missing one of its files instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Keep the scratch directory of a failed build
    #[arg(long)]
    pub preserve_scratch: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl BuildArgs {
    pub(crate) fn apply(&self, config: &mut Config) {
        self.store.apply(config);
        if let Some(scratch) = &self.scratch {
            config.store.scratch_path = scratch.clone();
        }
        if let Some(mirror) = &self.mirror {
            config.source.local_mirror = Some(mirror.clone());
        }
        if let Some(workers) = self.workers {
            config.source.workers = workers;
        }
        if self.strict {
            config.source.strict = true;
        }
        if self.preserve_scratch {
            config.store.preserve_scratch_on_failure = true;
        }
    }
}

pub fn run(args: BuildArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let source = source_from_config(&config.source)?;
    section_header("Building store");
    info(&format!("Source: {}", source.describe()));
    info(&format!("Store:  {}", config.store.store_path.display()));

    let show_progress = !args.no_progress && std::io::stderr().is_terminal();
    let pipeline = Pipeline::new(config.clone()).with_progress(show_progress);
    let summary = pipeline.build(source.as_ref())?;

    success(&format!("Store built in {:.1}s", summary.elapsed_secs));
    tree(&[
        ("States loaded", summary.states_fetched.to_string()),
        ("States skipped", summary.states_skipped.len().to_string()),
        ("Files extracted", summary.files_extracted.to_string()),
        ("Geographic rows", format_number(summary.geographic_rows)),
        ("Race rows", format_number(summary.race_rows)),
        (
            "Lines filtered",
            format_number(summary.geographic_stats.filtered as u64),
        ),
    ]);
    for (state, reason) in &summary.states_skipped {
        warning(&format!("{}: {}", state, reason));
    }
    for (state, reason) in &summary.files_dropped {
        warning(&format!("{}: {}", state, reason));
    }

    let report = IntegrityValidator::new(config.validation).report(&store_from(&config));
    if report.valid {
        success("Store matches the expected dataset");
    } else {
        warning("Store does not match the expected dataset:");
        for problem in &report.problems {
            tree_item(false, problem, None);
        }
    }
    Ok(())
}
