//! Population segment 00002 (`<st>00002.uf1`) parser.
//!
//! Comma-delimited, but the leading identification fields are fixed-width so
//! the state and logical record number are taken by byte offset. Fields 86..103
//! of the split line hold table P8, "Hispanic or Latino by Race".

use super::{fixed_field, latin1, next_line, ParseStats};
use crate::{Result, ZctaError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::{Path, PathBuf};

const STATE: Range<usize> = 5..7;
const LOGICAL_RECORD: Range<usize> = 15..22;

/// Position of table P8 within the comma-split line
pub const P8_FIELDS: Range<usize> = 86..103;

/// P8 cells the store uses, in published order
const P8_USED_CELLS: usize = 10;

/// The leading cells of table P8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct P8Table {
    pub total: u32,
    pub not_hispanic: u32,
    pub white: u32,
    pub black: u32,
    pub american_indian: u32,
    pub asian: u32,
    pub pacific_islander: u32,
    pub other: u32,
    pub multiracial: u32,
    pub hispanic: u32,
}

impl P8Table {
    fn from_cells(cells: &[&str]) -> std::result::Result<Self, String> {
        if cells.len() < P8_USED_CELLS {
            return Err(format!(
                "table P8 needs {} cells, found {}",
                P8_USED_CELLS,
                cells.len()
            ));
        }

        let mut values = [0u32; P8_USED_CELLS];
        for (index, (value, cell)) in values.iter_mut().zip(cells).enumerate() {
            *value = cell.trim().parse::<u32>().map_err(|e| {
                format!(
                    "P8 cell {} ({:?}) is not a non-negative count: {}",
                    index, cell, e
                )
            })?;
        }

        let [total, not_hispanic, white, black, american_indian, asian, pacific_islander, other, multiracial, hispanic] =
            values;

        Ok(Self {
            total,
            not_hispanic,
            white,
            black,
            american_indian,
            asian,
            pacific_islander,
            other,
            multiracial,
            hispanic,
        })
    }
}

/// One population row, joined to a header row by `(state, logical_record)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceCountRecord {
    pub state: String,
    pub logical_record: String,
    pub white: u32,
    pub black: u32,
    pub american_indian: u32,
    /// Asian plus Native Hawaiian and Other Pacific Islander
    pub asian_pacific: u32,
    pub hispanic: u32,
    pub multiracial: u32,
}

impl RaceCountRecord {
    pub fn from_p8(state: String, logical_record: String, p8: &P8Table) -> Result<Self> {
        let asian_pacific = p8.asian.checked_add(p8.pacific_islander).ok_or_else(|| {
            ZctaError::Parse(format!(
                "asian + pacific islander overflows for {}/{}",
                state, logical_record
            ))
        })?;

        Ok(Self {
            state,
            logical_record,
            white: p8.white,
            black: p8.black,
            american_indian: p8.american_indian,
            asian_pacific,
            hispanic: p8.hispanic,
            multiracial: p8.multiracial,
        })
    }
}

fn parse_line(line: &[u8]) -> std::result::Result<RaceCountRecord, String> {
    let state = fixed_field(line, STATE).ok_or("line too short for state")?;
    let logical_record =
        fixed_field(line, LOGICAL_RECORD).ok_or("line too short for logical record")?;

    let text = latin1(line);
    let fields: Vec<&str> = text.split(',').collect();
    let end = fields.len().min(P8_FIELDS.end);
    let cells = fields.get(P8_FIELDS.start..end).ok_or_else(|| {
        format!(
            "expected table P8 at fields {}..{}, line has {} fields",
            P8_FIELDS.start,
            P8_FIELDS.end,
            fields.len()
        )
    })?;

    let p8 = P8Table::from_cells(cells)?;
    RaceCountRecord::from_p8(state, logical_record, &p8).map_err(|e| e.to_string())
}

/// Streaming reader over a population segment file. Every line yields a record.
pub struct PopulationReader<R> {
    reader: R,
    buf: Vec<u8>,
    source: String,
    stats: ParseStats,
}

impl<R: BufRead> PopulationReader<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(2048),
            source: source.into(),
            stats: ParseStats::default(),
        }
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }
}

impl<R: BufRead> Iterator for PopulationReader<R> {
    type Item = Result<RaceCountRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match next_line(&mut self.reader, &mut self.buf) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => return Some(Err(e.into())),
        }
        self.stats.lines += 1;

        match parse_line(&self.buf) {
            Ok(record) => {
                self.stats.records += 1;
                Some(Ok(record))
            }
            Err(msg) => Some(Err(ZctaError::Parse(format!(
                "{} line {}: {}",
                self.source, self.stats.lines, msg
            )))),
        }
    }
}

/// A decompressed population segment file on disk
#[derive(Debug, Clone)]
pub struct PopulationFile {
    path: PathBuf,
}

impl PopulationFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> Result<PopulationReader<BufReader<File>>> {
        let file = File::open(&self.path)?;
        Ok(PopulationReader::new(
            BufReader::with_capacity(1 << 20, file),
            self.path.display().to_string(),
        ))
    }
}
