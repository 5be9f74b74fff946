//! Bulk loader. One transaction covers a whole build: tables, rows and
//! indexes become visible together on commit or not at all.

use crate::census::{GeographicRecord, RaceCountRecord};
use crate::storage::schema::{self, ModelSpec, GEOCODE_MODEL};
use crate::Result;
use rusqlite::{params, Connection, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const INSERT_GEOGRAPHIC: &str = "INSERT INTO geocode_logical (id, state, summary_level, logical_record, zcta)
     VALUES (NULL, ?1, ?2, ?3, ?4)";

// Columns are bound by name; P8 order (multiracial before hispanic) does not leak in
const INSERT_RACE: &str = "INSERT INTO geocode_race (id, state, logical_record, num_white, num_black,
     num_ai, num_api, num_hispanic, num_multi)
     VALUES (NULL, :state, :logical_record, :white, :black, :ai, :api, :hispanic, :multi)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub geographic_rows: u64,
    pub race_rows: u64,
}

/// An open load transaction. Dropping it without [`finish`](Self::finish)
/// rolls everything back.
pub struct StoreLoader<'conn> {
    tx: Transaction<'conn>,
    model: &'static ModelSpec,
    summary: LoadSummary,
}

impl<'conn> StoreLoader<'conn> {
    pub fn begin(conn: &'conn mut Connection) -> Result<Self> {
        let tx = conn.transaction()?;
        schema::create_tables(&tx, &GEOCODE_MODEL)?;
        debug!("Load transaction opened");
        Ok(Self {
            tx,
            model: &GEOCODE_MODEL,
            summary: LoadSummary::default(),
        })
    }

    pub fn insert_geographic<I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<GeographicRecord>>,
    {
        let mut stmt = self.tx.prepare_cached(INSERT_GEOGRAPHIC)?;
        let mut inserted = 0u64;
        for record in records {
            let record = record?;
            stmt.execute(params![
                record.state,
                record.summary_level,
                record.logical_record,
                record.zcta
            ])?;
            inserted += 1;
        }
        self.summary.geographic_rows += inserted;
        Ok(inserted)
    }

    pub fn insert_race_counts<I>(&mut self, records: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<RaceCountRecord>>,
    {
        let mut stmt = self.tx.prepare_cached(INSERT_RACE)?;
        let mut inserted = 0u64;
        for record in records {
            let record = record?;
            stmt.execute(rusqlite::named_params! {
                ":state": record.state,
                ":logical_record": record.logical_record,
                ":white": record.white,
                ":black": record.black,
                ":ai": record.american_indian,
                ":api": record.asian_pacific,
                ":hispanic": record.hispanic,
                ":multi": record.multiracial,
            })?;
            inserted += 1;
        }
        self.summary.race_rows += inserted;
        Ok(inserted)
    }

    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }

    /// Build the lookup indexes and commit
    pub fn finish(self) -> Result<LoadSummary> {
        schema::create_indexes(&self.tx, self.model)?;
        self.tx.commit()?;
        info!(
            geographic_rows = self.summary.geographic_rows,
            race_rows = self.summary.race_rows,
            "Load committed"
        );
        Ok(self.summary)
    }

    /// Discard every row inserted through this loader
    pub fn abort(self) -> Result<()> {
        warn!(
            geographic_rows = self.summary.geographic_rows,
            race_rows = self.summary.race_rows,
            "Rolling back load transaction"
        );
        self.tx.rollback()?;
        Ok(())
    }
}

/// Load both record streams in a single transaction
pub fn load<G, P>(conn: &mut Connection, geographic: G, race: P) -> Result<LoadSummary>
where
    G: IntoIterator<Item = Result<GeographicRecord>>,
    P: IntoIterator<Item = Result<RaceCountRecord>>,
{
    let mut loader = StoreLoader::begin(conn)?;
    let outcome = loader
        .insert_geographic(geographic)
        .and_then(|_| loader.insert_race_counts(race));

    match outcome {
        Ok(_) => loader.finish(),
        Err(e) => {
            loader.abort()?;
            Err(e)
        }
    }
}
