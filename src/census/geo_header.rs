//! Geographic header (`<st>geo.uf1`) parser.
//!
//! Fixed-width records. Only summary level 871 (state / 5-digit ZCTA) rows
//! are kept; the logical record number joins them to the population file.

use super::{fixed_field, next_line, ParseStats};
use crate::{Result, ZctaError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Summary level of state-by-ZCTA rows
pub const ZCTA_SUMMARY_LEVEL: &str = "871";

/// Markers of the non-residential placeholder ZCTAs (`NNNXX` land, `NNNHH` water)
pub const PLACEHOLDER_MARKERS: [&str; 2] = ["XX", "HH"];

const STATE: Range<usize> = 6..8;
const SUMMARY_LEVEL: Range<usize> = 8..11;
const LOGICAL_RECORD: Range<usize> = 18..25;
const ZCTA: Range<usize> = 160..165;

/// One retained header row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeographicRecord {
    pub state: String,
    pub summary_level: String,
    pub logical_record: String,
    pub zcta: String,
}

/// True when the ZCTA is one of the large-area or water placeholders
pub fn is_placeholder_zcta(zcta: &str) -> bool {
    PLACEHOLDER_MARKERS.iter().any(|marker| zcta.contains(marker))
}

enum LineOutcome {
    Record(GeographicRecord),
    OtherLevel,
    Placeholder,
}

fn parse_line(line: &[u8]) -> std::result::Result<LineOutcome, String> {
    match line.get(SUMMARY_LEVEL) {
        Some(level) if level == ZCTA_SUMMARY_LEVEL.as_bytes() => {}
        _ => return Ok(LineOutcome::OtherLevel),
    }

    let zcta = fixed_field(line, ZCTA).ok_or_else(|| {
        format!(
            "summary level {} record is {} bytes, too short for a ZCTA at {}..{}",
            ZCTA_SUMMARY_LEVEL,
            line.len(),
            ZCTA.start,
            ZCTA.end
        )
    })?;

    if is_placeholder_zcta(&zcta) {
        return Ok(LineOutcome::Placeholder);
    }

    // The ZCTA offset is the furthest, so the shorter fields are present
    let state = fixed_field(line, STATE).unwrap_or_default();
    let logical_record = fixed_field(line, LOGICAL_RECORD).unwrap_or_default();

    Ok(LineOutcome::Record(GeographicRecord {
        state,
        summary_level: ZCTA_SUMMARY_LEVEL.to_string(),
        logical_record,
        zcta,
    }))
}

/// Streaming reader over a geographic header file
pub struct GeoHeaderReader<R> {
    reader: R,
    buf: Vec<u8>,
    source: String,
    stats: ParseStats,
}

impl<R: BufRead> GeoHeaderReader<R> {
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(512),
            source: source.into(),
            stats: ParseStats::default(),
        }
    }

    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }
}

impl<R: BufRead> Iterator for GeoHeaderReader<R> {
    type Item = Result<GeographicRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match next_line(&mut self.reader, &mut self.buf) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => return Some(Err(e.into())),
            }
            self.stats.lines += 1;

            match parse_line(&self.buf) {
                Ok(LineOutcome::Record(record)) => {
                    self.stats.records += 1;
                    return Some(Ok(record));
                }
                Ok(LineOutcome::OtherLevel) => self.stats.skipped += 1,
                Ok(LineOutcome::Placeholder) => self.stats.filtered += 1,
                Err(msg) => {
                    return Some(Err(ZctaError::Parse(format!(
                        "{} line {}: {}",
                        self.source, self.stats.lines, msg
                    ))))
                }
            }
        }
    }
}

/// A decompressed header file on disk. Each call to [`records`](Self::records)
/// starts a fresh pass from the top of the file.
#[derive(Debug, Clone)]
pub struct GeoHeaderFile {
    path: PathBuf,
}

impl GeoHeaderFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> Result<GeoHeaderReader<BufReader<File>>> {
        let file = File::open(&self.path)?;
        Ok(GeoHeaderReader::new(
            BufReader::with_capacity(1 << 20, file),
            self.path.display().to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn header_line(state: &str, level: &str, logrec: &str, zcta: &str) -> String {
        let mut line = vec![b' '; 200];
        line[0..6].copy_from_slice(b"uSF1  ");
        line[STATE].copy_from_slice(state.as_bytes());
        line[SUMMARY_LEVEL].copy_from_slice(level.as_bytes());
        line[LOGICAL_RECORD].copy_from_slice(logrec.as_bytes());
        line[ZCTA].copy_from_slice(zcta.as_bytes());
        String::from_utf8(line).unwrap()
    }

    fn read_all(content: &str) -> (Vec<GeographicRecord>, ParseStats) {
        let mut reader = GeoHeaderReader::new(Cursor::new(content.as_bytes().to_vec()), "test");
        let records = reader.by_ref().collect::<Result<Vec<_>>>().unwrap();
        (records, *reader.stats())
    }

    #[test]
    fn test_extracts_fields_at_fixed_offsets() {
        let content = header_line("06", "871", "0000001", "90210");
        let (records, _) = read_all(&content);

        assert_eq!(
            records,
            vec![GeographicRecord {
                state: "06".to_string(),
                summary_level: "871".to_string(),
                logical_record: "0000001".to_string(),
                zcta: "90210".to_string(),
            }]
        );
    }

    #[test]
    fn test_keeps_only_zcta_summary_level() {
        let content = [
            header_line("CA", "040", "0000001", "     "),
            header_line("CA", "871", "0000002", "90001"),
            header_line("CA", "050", "0000003", "     "),
            header_line("CA", "871", "0000004", "90002"),
        ]
        .join("\n");

        let (records, stats) = read_all(&content);
        let zctas: Vec<_> = records.iter().map(|r| r.zcta.as_str()).collect();
        assert_eq!(zctas, vec!["90001", "90002"]);
        assert_eq!(stats.lines, 4);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_drops_placeholder_zctas() {
        let content = [
            header_line("AK", "871", "0000010", "995XX"),
            header_line("AK", "871", "0000011", "996HH"),
            header_line("AK", "871", "0000012", "XX123"),
            header_line("AK", "871", "0000013", "99501"),
        ]
        .join("\r\n");

        let (records, stats) = read_all(&content);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].zcta, "99501");
        assert_eq!(stats.filtered, 3);
    }

    #[test]
    fn test_placeholder_filter_does_not_reject_ordinary_codes() {
        assert!(!is_placeholder_zcta("90210"));
        assert!(!is_placeholder_zcta("0H1X0"));
        assert!(is_placeholder_zcta("HH000"));
        assert!(is_placeholder_zcta("350XX"));
    }

    #[test]
    fn test_short_qualifying_line_is_a_parse_error() {
        let mut line = header_line("CA", "871", "0000002", "90001");
        line.truncate(150);

        let mut reader = GeoHeaderReader::new(Cursor::new(line.into_bytes()), "cageo.uf1");
        match reader.next() {
            Some(Err(ZctaError::Parse(msg))) => {
                assert!(msg.contains("cageo.uf1 line 1"), "message was: {}", msg);
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_lines_at_other_levels_are_skipped() {
        let content = format!("uSF1  CA040\n{}", header_line("CA", "871", "0000002", "90001"));
        let (records, stats) = read_all(&content);
        assert_eq!(records.len(), 1);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_latin1_bytes_do_not_shift_offsets() {
        // A place name with a Latin-1 byte before the ZCTA column
        let mut line = header_line("PR", "871", "0000100", "00601").into_bytes();
        line[100] = 0xF1;
        let mut reader = GeoHeaderReader::new(Cursor::new(line), "prgeo.uf1");
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.zcta, "00601");
        assert_eq!(record.logical_record, "0000100");
    }

    #[test]
    fn test_file_records_restart_from_top() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cageo.uf1");
        std::fs::write(&path, header_line("CA", "871", "0000002", "90001")).unwrap();

        let file = GeoHeaderFile::new(&path);
        let first: Vec<_> = file.records().unwrap().collect::<Result<_>>().unwrap();
        let second: Vec<_> = file.records().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }
}
