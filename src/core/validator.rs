//! Dataset fingerprint check.
//!
//! Compares the row count of each table against the counts of the dataset
//! the pipeline targets. Catches truncated or wrong-version loads; it is not
//! a content checksum.

use crate::storage::schema::{row_count, TableSpec, GEOCODE_LOGICAL_TABLE, GEOCODE_RACE_TABLE};
use crate::storage::Store;
use crate::{Result, ZctaError};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Census 2000 SF1, all states plus DC and Puerto Rico
pub const CENSUS_2000_SF1: ExpectedCounts = ExpectedCounts {
    geographic_rows: 33_233,
    race_rows: 9_541_315,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedCounts {
    pub geographic_rows: u64,
    pub race_rows: u64,
}

impl Default for ExpectedCounts {
    fn default() -> Self {
        CENSUS_2000_SF1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCheck {
    pub table: String,
    pub expected: u64,
    /// `None` when the count could not be read
    pub actual: Option<u64>,
}

impl TableCheck {
    pub fn matches(&self) -> bool {
        self.actual == Some(self.expected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub tables: Vec<TableCheck>,
    pub problems: Vec<String>,
}

pub struct IntegrityValidator {
    expected: ExpectedCounts,
}

impl IntegrityValidator {
    pub fn new(expected: ExpectedCounts) -> Self {
        Self { expected }
    }

    pub fn expected(&self) -> &ExpectedCounts {
        &self.expected
    }

    fn checks(&self) -> [(&'static TableSpec, u64); 2] {
        [
            (&GEOCODE_LOGICAL_TABLE, self.expected.geographic_rows),
            (&GEOCODE_RACE_TABLE, self.expected.race_rows),
        ]
    }

    /// Strict check: storage errors and count mismatches both surface as errors
    pub fn check(&self, conn: &Connection) -> Result<()> {
        for (table, expected) in self.checks() {
            let actual = row_count(conn, table)?;
            debug!(table = table.name, expected, actual, "Row count");
            if actual != expected {
                return Err(ZctaError::ValidationFailed(format!(
                    "{} has {} rows, expected {}",
                    table.name, actual, expected
                )));
            }
        }
        Ok(())
    }

    /// Validity signal. Never fails; the cause of a negative verdict is logged.
    pub fn is_valid(&self, conn: &Connection) -> bool {
        match self.check(conn) {
            Ok(()) => true,
            Err(e) => {
                error!("Store failed validation: {}", e);
                false
            }
        }
    }

    pub fn is_store_valid(&self, store: &Store) -> bool {
        match store.open_read_only() {
            Ok(conn) => self.is_valid(&conn),
            Err(e) => {
                error!("Cannot open store {}: {}", store.path().display(), e);
                false
            }
        }
    }

    /// Per-table detail for reporting
    pub fn report(&self, store: &Store) -> ValidationReport {
        let conn = match store.open_read_only() {
            Ok(conn) => conn,
            Err(e) => {
                return ValidationReport {
                    valid: false,
                    tables: self
                        .checks()
                        .iter()
                        .map(|(table, expected)| TableCheck {
                            table: table.name.to_string(),
                            expected: *expected,
                            actual: None,
                        })
                        .collect(),
                    problems: vec![format!("cannot open {}: {}", store.path().display(), e)],
                }
            }
        };

        let mut problems = Vec::new();
        let tables: Vec<TableCheck> = self
            .checks()
            .iter()
            .map(|(table, expected)| {
                let actual = match row_count(&conn, table) {
                    Ok(count) => Some(count),
                    Err(e) => {
                        problems.push(format!("{}: {}", table.name, e));
                        None
                    }
                };
                TableCheck {
                    table: table.name.to_string(),
                    expected: *expected,
                    actual,
                }
            })
            .collect();

        for check in tables.iter().filter(|c| !c.matches()) {
            if let Some(actual) = check.actual {
                problems.push(format!(
                    "{} has {} rows, expected {}",
                    check.table, actual, check.expected
                ));
            }
        }

        ValidationReport {
            valid: problems.is_empty(),
            tables,
            problems,
        }
    }
}

impl Default for IntegrityValidator {
    fn default() -> Self {
        Self::new(ExpectedCounts::default())
    }
}
