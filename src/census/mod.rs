//! Census 2000 Summary File 1 record formats.
//!
//! Each state publishes two files the store is built from: the geographic
//! header (`<st>geo.uf1`) and population segment 00002 (`<st>00002.uf1`),
//! distributed as `<st>geo_uf1.zip` and `<st>00002_uf1.zip`. Both are read as
//! Latin-1, where one byte is one character, so byte offsets and character
//! offsets coincide.

pub mod geo_header;
pub mod population;

pub use geo_header::{GeoHeaderFile, GeoHeaderReader, GeographicRecord};
pub use population::{P8Table, PopulationFile, PopulationReader, RaceCountRecord};

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};
use std::ops::Range;

/// The two per-state files a build consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordKind {
    GeoHeader,
    PopulationTable,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::GeoHeader, RecordKind::PopulationTable];

    /// Record-type code embedded in the published filename
    pub fn code(&self) -> &'static str {
        match self {
            RecordKind::GeoHeader => "geo",
            RecordKind::PopulationTable => "00002",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RecordKind::GeoHeader => "geographic header",
            RecordKind::PopulationTable => "population table",
        }
    }

    /// Suffix of the published archive, e.g. `geo_uf1.zip`
    pub fn archive_suffix(&self) -> String {
        format!("{}_uf1.zip", self.code())
    }

    /// Classify a remote filename, `None` for everything the build ignores
    pub fn classify(filename: &str) -> Option<RecordKind> {
        Self::ALL
            .into_iter()
            .find(|kind| filename.ends_with(&kind.archive_suffix()))
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Name of the single member inside a published archive.
///
/// `akgeo_uf1.zip` holds `akgeo.uf1`; `ak00002_uf1.zip` holds `ak00002.uf1`.
pub fn member_name(archive_name: &str) -> Option<String> {
    let stem = archive_name.strip_suffix(".zip")?;
    if stem.is_empty() {
        return None;
    }
    Some(stem.replace('_', "."))
}

/// Per-file parse counters, reported after a file has been consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    pub lines: usize,
    pub records: usize,
    /// Lines at a summary level other than the one retained
    pub skipped: usize,
    /// Lines dropped by the placeholder ZCTA filter
    pub filtered: usize,
}

impl ParseStats {
    pub fn merge(&mut self, other: &ParseStats) {
        self.lines += other.lines;
        self.records += other.records;
        self.skipped += other.skipped;
        self.filtered += other.filtered;
    }
}

/// Decode Latin-1 bytes. Every byte maps to the code point of the same value.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Fixed-width field as Latin-1 text, `None` when the line is too short
pub(crate) fn fixed_field(line: &[u8], range: Range<usize>) -> Option<String> {
    line.get(range).map(latin1)
}

/// Read the next line into `buf` without its terminator. Returns `false` at EOF.
pub(crate) fn next_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(false);
    }
    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_classify_archive_names() {
        assert_eq!(RecordKind::classify("algeo_uf1.zip"), Some(RecordKind::GeoHeader));
        assert_eq!(
            RecordKind::classify("al00002_uf1.zip"),
            Some(RecordKind::PopulationTable)
        );
        assert_eq!(RecordKind::classify("al00001_uf1.zip"), None);
        assert_eq!(RecordKind::classify("algeo.uf1"), None);
    }

    #[test]
    fn test_member_name() {
        assert_eq!(member_name("algeo_uf1.zip").as_deref(), Some("algeo.uf1"));
        assert_eq!(member_name("wy00002_uf1.zip").as_deref(), Some("wy00002.uf1"));
        assert_eq!(member_name("algeo.uf1"), None);
        assert_eq!(member_name(".zip"), None);
    }

    #[test]
    fn test_latin1_is_one_char_per_byte() {
        // 0xF1 is n-tilde in Latin-1 and an invalid lone byte in UTF-8
        let bytes = b"Espa\xF1ola";
        let decoded = latin1(bytes);
        assert_eq!(decoded.chars().count(), bytes.len());
        assert_eq!(decoded, "Española");
    }

    #[test]
    fn test_next_line_strips_terminators() {
        let mut cursor = Cursor::new(b"first\r\nsecond\nthird".to_vec());
        let mut buf = Vec::new();

        assert!(next_line(&mut cursor, &mut buf).unwrap());
        assert_eq!(buf, b"first");
        assert!(next_line(&mut cursor, &mut buf).unwrap());
        assert_eq!(buf, b"second");
        assert!(next_line(&mut cursor, &mut buf).unwrap());
        assert_eq!(buf, b"third");
        assert!(!next_line(&mut cursor, &mut buf).unwrap());
    }
}
