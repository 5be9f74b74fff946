//! ZCTA lookups against a committed store.
//!
//! A lookup joins the header row for a ZCTA to its race counts through
//! `(state, logical_record)` and normalises the six counts into shares.
//! Missing data is not an error: it yields the error-flagged vector.

use crate::storage::Store;
use crate::Result;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept in each share
pub const PRECISION: i32 = 5;

const SELECT_LOGICAL: &str = "SELECT state, logical_record FROM geocode_logical
     WHERE zcta = ?1 ORDER BY id LIMIT 1";

const SELECT_COUNTS: &str = "SELECT num_white, num_black, num_ai, num_api, num_hispanic, num_multi
     FROM geocode_race WHERE logical_record = ?1 AND state = ?2 ORDER BY id LIMIT 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceCategory {
    White,
    Black,
    AmericanIndian,
    AsianPacific,
    Hispanic,
    Multiracial,
}

impl RaceCategory {
    /// Fixed category order used by every array view
    pub const ALL: [RaceCategory; 6] = [
        RaceCategory::White,
        RaceCategory::Black,
        RaceCategory::AmericanIndian,
        RaceCategory::AsianPacific,
        RaceCategory::Hispanic,
        RaceCategory::Multiracial,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RaceCategory::White => "white",
            RaceCategory::Black => "black",
            RaceCategory::AmericanIndian => "ai",
            RaceCategory::AsianPacific => "api",
            RaceCategory::Hispanic => "hispanic",
            RaceCategory::Multiracial => "multi",
        }
    }
}

impl fmt::Display for RaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Joined counts for one ZCTA
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceCounts {
    pub white: u64,
    pub black: u64,
    pub american_indian: u64,
    pub asian_pacific: u64,
    pub hispanic: u64,
    pub multiracial: u64,
}

impl RaceCounts {
    pub fn as_array(&self) -> [u64; 6] {
        [
            self.white,
            self.black,
            self.american_indian,
            self.asian_pacific,
            self.hispanic,
            self.multiracial,
        ]
    }

    pub fn total(&self) -> u64 {
        self.as_array().iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityVector {
    pub zcta: String,
    pub white: f64,
    pub black: f64,
    pub american_indian: f64,
    pub asian_pacific: f64,
    pub hispanic: f64,
    pub multiracial: f64,
    /// Set when there is no data for the key; the shares are then all zero
    pub error: bool,
}

fn round_share(count: u64, total: u64) -> f64 {
    let scale = 10f64.powi(PRECISION);
    (count as f64 / total as f64 * scale).round() / scale
}

impl ProbabilityVector {
    /// The all-zero vector flagged as "no data for this key"
    pub fn error(zcta: impl Into<String>) -> Self {
        Self {
            zcta: zcta.into(),
            white: 0.0,
            black: 0.0,
            american_indian: 0.0,
            asian_pacific: 0.0,
            hispanic: 0.0,
            multiracial: 0.0,
            error: true,
        }
    }

    /// Normalise counts into shares. A zero total yields the error vector.
    pub fn from_counts(zcta: impl Into<String>, counts: &RaceCounts) -> Self {
        let total = counts.total();
        if total == 0 {
            return Self::error(zcta);
        }
        Self {
            zcta: zcta.into(),
            white: round_share(counts.white, total),
            black: round_share(counts.black, total),
            american_indian: round_share(counts.american_indian, total),
            asian_pacific: round_share(counts.asian_pacific, total),
            hispanic: round_share(counts.hispanic, total),
            multiracial: round_share(counts.multiracial, total),
            error: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error
    }

    pub fn as_array(&self) -> [f64; 6] {
        [
            self.white,
            self.black,
            self.american_indian,
            self.asian_pacific,
            self.hispanic,
            self.multiracial,
        ]
    }

    pub fn get(&self, category: RaceCategory) -> f64 {
        match category {
            RaceCategory::White => self.white,
            RaceCategory::Black => self.black,
            RaceCategory::AmericanIndian => self.american_indian,
            RaceCategory::AsianPacific => self.asian_pacific,
            RaceCategory::Hispanic => self.hispanic,
            RaceCategory::Multiracial => self.multiracial,
        }
    }

    /// Category with the largest share; the first in [`RaceCategory::ALL`] wins ties
    pub fn dominant(&self) -> Option<RaceCategory> {
        if self.error {
            return None;
        }
        RaceCategory::ALL.into_iter().fold(None, |best, category| match best {
            Some(b) if self.get(b) >= self.get(category) => Some(b),
            _ => Some(category),
        })
    }
}

impl fmt::Display for ProbabilityVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error {
            return write!(f, "{}: no data", self.zcta);
        }
        write!(f, "{}:", self.zcta)?;
        for category in RaceCategory::ALL {
            write!(f, " {}={:.5}", category.label(), self.get(category))?;
        }
        Ok(())
    }
}

/// Read-only lookups over one connection.
///
/// The engine holds no mutable state. A connection is not shareable across
/// threads, so concurrent callers each open their own engine on the same store.
pub struct LookupEngine {
    conn: Connection,
}

impl LookupEngine {
    pub fn open(store: &Store) -> Result<Self> {
        Ok(Self::from_connection(store.open_read_only()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Raw joined counts, `None` when either side of the join is missing
    pub fn counts(&self, zcta: &str) -> Result<Option<RaceCounts>> {
        let mut logical = self.conn.prepare_cached(SELECT_LOGICAL)?;
        let key: Option<(String, String)> = logical
            .query_row([zcta], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        let Some((state, logical_record)) = key else {
            return Ok(None);
        };

        let mut counts = self.conn.prepare_cached(SELECT_COUNTS)?;
        let row = counts
            .query_row([logical_record.as_str(), state.as_str()], |row| {
                let column = |i: usize| -> rusqlite::Result<u64> {
                    let value: i64 = row.get(i)?;
                    Ok(value.max(0) as u64)
                };
                Ok(RaceCounts {
                    white: column(0)?,
                    black: column(1)?,
                    american_indian: column(2)?,
                    asian_pacific: column(3)?,
                    hispanic: column(4)?,
                    multiracial: column(5)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    /// Probability vector for a 5-character ZCTA. Storage failures are errors;
    /// absent or unusable data is the error vector.
    pub fn lookup(&self, zcta: &str) -> Result<ProbabilityVector> {
        let key = zcta.trim();
        if key.chars().count() != 5 {
            return Ok(ProbabilityVector::error(key));
        }
        Ok(match self.counts(key)? {
            Some(counts) => ProbabilityVector::from_counts(key, &counts),
            None => ProbabilityVector::error(key),
        })
    }
}
