//! Full build: fetch, extract, parse and load into a staging file, then swap
//! the staging file in as the live store.

use crate::census::{GeoHeaderFile, ParseStats, PopulationFile, RecordKind};
use crate::core::config::Config;
use crate::download::{extract_all, Fetcher, RemoteSource, StateFiles};
use crate::storage::{LoadSummary, Store, StoreLoader};
use crate::utils::parallel::worker_pool;
use crate::utils::progress::{Stage, StageProgress};
use crate::utils::temp_workspace::{ScratchWorkspace, WorkspaceConfig};
use crate::{Result, ZctaError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub states_fetched: usize,
    /// States left out of the store, with the reason
    pub states_skipped: Vec<(String, String)>,
    pub files_extracted: usize,
    /// Archives that failed to extract
    pub files_dropped: Vec<(String, String)>,
    pub geographic_rows: u64,
    pub race_rows: u64,
    pub geographic_stats: ParseStats,
    pub population_stats: ParseStats,
    pub elapsed_secs: f64,
}

pub struct Pipeline {
    config: Config,
    show_progress: bool,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Store {
        Store::new(&self.config.store.store_path)
    }

    /// Rebuild the store from `source`. The previous store stays in place
    /// until the new one has been fully committed.
    pub fn build(&self, source: &dyn RemoteSource) -> Result<BuildSummary> {
        self.config.validate()?;
        let started = Instant::now();

        let mut workspace = ScratchWorkspace::acquire(
            "build",
            WorkspaceConfig {
                scratch_root: self.config.store.scratch_path.clone(),
                preserve_on_failure: self.config.store.preserve_scratch_on_failure,
            },
        )?;

        let outcome = self.build_in(&workspace, source);
        match &outcome {
            Ok(_) => workspace.mark_completed()?,
            Err(e) => {
                error!("Build failed: {}", e);
                workspace.mark_failed(&e.to_string())?;
            }
        }
        if let Some(kept) = workspace.release()? {
            info!("Scratch files kept at {}", kept.display());
        }

        let mut summary = outcome?;
        summary.elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            states = summary.states_fetched,
            geographic_rows = summary.geographic_rows,
            race_rows = summary.race_rows,
            "Build finished in {:.1}s",
            summary.elapsed_secs
        );
        Ok(summary)
    }

    fn build_in(
        &self,
        workspace: &ScratchWorkspace,
        source: &dyn RemoteSource,
    ) -> Result<BuildSummary> {
        let pool = worker_pool(self.config.source.effective_workers())?;

        let fetch_progress = StageProgress::new(Stage::Fetch, self.show_progress);
        let report = Fetcher::new(source, &self.config.source).fetch_all(
            &workspace.downloads(),
            &pool,
            &fetch_progress,
        )?;
        if report.fetched.is_empty() {
            return Err(ZctaError::SourceUnavailable(format!(
                "no state archives retrieved from {}",
                source.describe()
            )));
        }

        let extract_progress = StageProgress::new(Stage::Extract, self.show_progress);
        let (files, dropped) = extract_all(&report.fetched, &pool, &extract_progress);

        let load_progress = StageProgress::new(Stage::Load, self.show_progress);
        let loaded = load_files(&self.store(), &files, &load_progress)?;

        Ok(BuildSummary {
            states_fetched: report.fetched.len(),
            states_skipped: report.skipped,
            files_extracted: files.iter().map(|s| s.files.len()).sum(),
            files_dropped: dropped,
            geographic_rows: loaded.rows.geographic_rows,
            race_rows: loaded.rows.race_rows,
            geographic_stats: loaded.geographic,
            population_stats: loaded.population,
            elapsed_secs: 0.0,
        })
    }
}

/// Outcome of loading a set of decompressed files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadedFiles {
    pub rows: LoadSummary,
    pub geographic: ParseStats,
    pub population: ParseStats,
}

/// Load decompressed state files into a staging copy of `store` and swap it
/// in. Any error leaves the existing store untouched.
pub fn load_files(
    store: &Store,
    files: &[StateFiles],
    progress: &StageProgress,
) -> Result<LoadedFiles> {
    let mut conn = store.create_staging()?;
    let loaded = load_into(&mut conn, files, progress);
    drop(conn);

    match loaded {
        Ok(loaded) => {
            store.promote_staging()?;
            Ok(loaded)
        }
        Err(e) => {
            store.discard_staging();
            Err(e)
        }
    }
}

fn load_into(
    conn: &mut Connection,
    files: &[StateFiles],
    progress: &StageProgress,
) -> Result<LoadedFiles> {
    let mut sorted: Vec<&StateFiles> = files.iter().collect();
    sorted.sort_by(|a, b| a.state.cmp(&b.state));
    progress.set_length(sorted.iter().map(|s| s.files.len() as u64).sum());

    let mut loaded = LoadedFiles::default();
    let mut loader = StoreLoader::begin(conn)?;

    let outcome = (|| -> Result<()> {
        for state in &sorted {
            let Some(path) = state.get(RecordKind::GeoHeader) else {
                warn!(state = state.state.as_str(), "No geographic header file to load");
                continue;
            };
            progress.set_message(format!("{} geo", state.state));
            let mut reader = GeoHeaderFile::new(path).records()?;
            let rows = loader.insert_geographic(&mut reader)?;
            debug!(state = state.state.as_str(), rows, "Geographic header loaded");
            loaded.geographic.merge(reader.stats());
            progress.inc(1);
        }

        for state in &sorted {
            let Some(path) = state.get(RecordKind::PopulationTable) else {
                warn!(state = state.state.as_str(), "No population table file to load");
                continue;
            };
            progress.set_message(format!("{} P8", state.state));
            let mut reader = PopulationFile::new(path).records()?;
            let rows = loader.insert_race_counts(&mut reader)?;
            debug!(state = state.state.as_str(), rows, "Population table loaded");
            loaded.population.merge(reader.stats());
            progress.inc(1);
        }
        Ok(())
    })();

    match outcome {
        Ok(()) => {
            loaded.rows = loader.finish()?;
            progress.finish(&format!(
                "{} geographic, {} race rows",
                loaded.rows.geographic_rows, loaded.rows.race_rows
            ));
            Ok(loaded)
        }
        Err(e) => {
            loader.abort()?;
            Err(e)
        }
    }
}
