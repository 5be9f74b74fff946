pub mod census;
pub mod cli;
pub mod core;
pub mod download;
pub mod storage;
pub mod utils;

pub use crate::core::{
    lookup::{LookupEngine, ProbabilityVector, RaceCategory},
    pipeline::{BuildSummary, Pipeline},
    validator::{ExpectedCounts, IntegrityValidator},
};
pub use crate::storage::Store;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZctaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Missing expected file: {0}")]
    MissingExpectedFile(String),

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ZctaError {
    /// Errors that only cost one state's data rather than the whole run
    pub fn is_per_state(&self) -> bool {
        matches!(
            self,
            ZctaError::MissingExpectedFile(_) | ZctaError::CorruptArchive(_)
        )
    }
}

impl From<rusqlite::Error> for ZctaError {
    fn from(err: rusqlite::Error) -> Self {
        ZctaError::Persistence(err.to_string())
    }
}

impl From<reqwest::Error> for ZctaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ZctaError::SourceUnavailable(format!("request timed out: {}", err))
        } else {
            ZctaError::SourceUnavailable(err.to_string())
        }
    }
}

impl From<zip::result::ZipError> for ZctaError {
    fn from(err: zip::result::ZipError) -> Self {
        ZctaError::CorruptArchive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ZctaError>;
