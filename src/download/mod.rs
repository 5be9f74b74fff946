pub mod extract;
pub mod http;
pub mod source;

pub use extract::{extract_member, ExtractedFile};
pub use http::HttpSource;
pub use source::{LocalMirrorSource, RemoteSource};

use crate::census::RecordKind;
use crate::core::config::SourceConfig;
use crate::utils::progress::StageProgress;
use crate::{Result, ZctaError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Build the configured source: a local mirror when one is set, HTTP otherwise
pub fn source_from_config(config: &SourceConfig) -> Result<Box<dyn RemoteSource>> {
    match &config.local_mirror {
        Some(root) => Ok(Box::new(LocalMirrorSource::new(root))),
        None => Ok(Box::new(HttpSource::new(
            &config.base_url,
            &config.base_path,
            config.timeout(),
        )?)),
    }
}

/// Listing entries from `first` onward. Earlier entries (national files,
/// readmes) are not states.
pub fn states_from<'a, I>(listing: I, first: &'a str) -> impl Iterator<Item = String> + 'a
where
    I: IntoIterator<Item = String>,
    I::IntoIter: 'a,
{
    listing.into_iter().skip_while(move |entry| entry != first)
}

/// Pick the two expected archives out of a state directory listing
pub fn select_archives(state: &str, files: &[String]) -> Result<BTreeMap<RecordKind, String>> {
    let mut selected = BTreeMap::new();
    for file in files {
        if let Some(kind) = RecordKind::classify(file) {
            if let Some(previous) = selected.insert(kind, file.clone()) {
                warn!(state, "Multiple {} archives, using {} over {}", kind, file, previous);
            }
        }
    }

    for kind in RecordKind::ALL {
        if !selected.contains_key(&kind) {
            return Err(ZctaError::MissingExpectedFile(format!(
                "{}: no *{} in state directory",
                state,
                kind.archive_suffix()
            )));
        }
    }
    Ok(selected)
}

/// Archives retrieved for one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateArchives {
    pub state: String,
    pub archives: BTreeMap<RecordKind, PathBuf>,
}

#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<StateArchives>,
    /// States left out, with the reason
    pub skipped: Vec<(String, String)>,
    pub bytes: u64,
}

pub struct Fetcher<'a> {
    source: &'a dyn RemoteSource,
    first_state: String,
    strict: bool,
}

impl<'a> Fetcher<'a> {
    pub fn new(source: &'a dyn RemoteSource, config: &SourceConfig) -> Self {
        Self {
            source,
            first_state: config.first_state.clone(),
            strict: config.strict,
        }
    }

    /// Fetch both archives of every state into `dest`, one state per worker.
    ///
    /// `SourceUnavailable` from any state fails the whole fetch. A state
    /// missing a file is skipped with a warning, or fails the fetch in strict
    /// mode.
    pub fn fetch_all(
        &self,
        dest: &Path,
        pool: &rayon::ThreadPool,
        progress: &StageProgress,
    ) -> Result<FetchReport> {
        let listing = self.source.list_states()?;
        let states: Vec<String> = states_from(listing, &self.first_state).collect();
        if states.is_empty() {
            return Err(ZctaError::SourceUnavailable(format!(
                "{} has no entry named {}",
                self.source.describe(),
                self.first_state
            )));
        }
        info!(
            states = states.len(),
            "Fetching from {}",
            self.source.describe()
        );
        progress.set_length(states.len() as u64);

        let results: Vec<(String, Result<(StateArchives, u64)>)> = pool.install(|| {
            states
                .par_iter()
                .map(|state| {
                    let result = self.fetch_state(state, dest);
                    progress.inc(1);
                    (state.clone(), result)
                })
                .collect()
        });

        let mut report = FetchReport::default();
        for (state, result) in results {
            match result {
                Ok((archives, bytes)) => {
                    report.bytes += bytes;
                    report.fetched.push(archives);
                }
                Err(e) if e.is_per_state() && !self.strict => {
                    warn!(state = state.as_str(), "Skipping state: {}", e);
                    report.skipped.push((state, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        progress.finish(&format!(
            "{} states fetched, {} skipped",
            report.fetched.len(),
            report.skipped.len()
        ));
        Ok(report)
    }

    fn fetch_state(&self, state: &str, dest: &Path) -> Result<(StateArchives, u64)> {
        let files = self.source.list_files(state)?;
        let selected = select_archives(state, &files)?;

        let mut archives = BTreeMap::new();
        let mut bytes = 0;
        for (kind, filename) in selected {
            let path = dest.join(&filename);
            bytes += self.source.fetch(state, &filename, &path)?;
            archives.insert(kind, path);
        }

        Ok((
            StateArchives {
                state: state.to_string(),
                archives,
            },
            bytes,
        ))
    }
}

/// Decompressed files for one state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFiles {
    pub state: String,
    pub files: BTreeMap<RecordKind, PathBuf>,
}

impl StateFiles {
    pub fn get(&self, kind: RecordKind) -> Option<&Path> {
        self.files.get(&kind).map(PathBuf::as_path)
    }
}

/// Extract every fetched archive. A corrupt archive loses only that file.
pub fn extract_all(
    fetched: &[StateArchives],
    pool: &rayon::ThreadPool,
    progress: &StageProgress,
) -> (Vec<StateFiles>, Vec<(String, String)>) {
    let jobs: Vec<(&str, RecordKind, &Path)> = fetched
        .iter()
        .flat_map(|s| {
            s.archives
                .iter()
                .map(move |(kind, path)| (s.state.as_str(), *kind, path.as_path()))
        })
        .collect();
    progress.set_length(jobs.len() as u64);

    let results: Vec<_> = pool.install(|| {
        jobs.par_iter()
            .map(|(state, kind, path)| {
                let result = extract_member(path);
                progress.inc(1);
                (*state, *kind, result)
            })
            .collect()
    });

    let mut by_state: BTreeMap<&str, BTreeMap<RecordKind, PathBuf>> = BTreeMap::new();
    let mut failed = Vec::new();
    for (state, kind, result) in results {
        match result {
            Ok(extracted) => {
                by_state.entry(state).or_default().insert(kind, extracted.path);
            }
            Err(e) => {
                warn!(state, "Dropping {} file: {}", kind, e);
                failed.push((state.to_string(), e.to_string()));
            }
        }
    }

    progress.finish(&format!("{} files extracted", jobs.len() - failed.len()));
    let files = by_state
        .into_iter()
        .map(|(state, files)| StateFiles {
            state: state.to_string(),
            files,
        })
        .collect();
    (files, failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_states_from_skips_leading_entries() {
        let listing = names(&["0Final_National", "0README", "Alabama", "Alaska", "Wyoming"]);
        let states: Vec<_> = states_from(listing, "Alabama").collect();
        assert_eq!(states, names(&["Alabama", "Alaska", "Wyoming"]));
    }

    #[test]
    fn test_states_from_keeps_later_non_matching_entries() {
        // Only the prefix is skipped; the filter does not re-apply after the first match
        let listing = names(&["Alabama", "0Late", "Alaska"]);
        let states: Vec<_> = states_from(listing, "Alabama").collect();
        assert_eq!(states.len(), 3);
    }

    #[test]
    fn test_states_from_without_anchor_is_empty() {
        let listing = names(&["0Final_National", "Alaska"]);
        assert_eq!(states_from(listing, "Alabama").count(), 0);
    }

    #[test]
    fn test_select_archives() {
        let files = names(&[
            "al00001_uf1.zip",
            "al00002_uf1.zip",
            "al00003_uf1.zip",
            "algeo_uf1.zip",
            "sf1_al.txt",
        ]);
        let selected = select_archives("Alabama", &files).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[&RecordKind::GeoHeader], "algeo_uf1.zip");
        assert_eq!(selected[&RecordKind::PopulationTable], "al00002_uf1.zip");
    }

    #[test]
    fn test_select_archives_reports_missing_file() {
        let files = names(&["al00001_uf1.zip", "algeo_uf1.zip"]);
        match select_archives("Alabama", &files) {
            Err(ZctaError::MissingExpectedFile(msg)) => {
                assert!(msg.contains("00002_uf1.zip"), "message was: {}", msg)
            }
            other => panic!("Expected MissingExpectedFile, got {:?}", other),
        }
    }
}
