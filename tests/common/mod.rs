//! Shared fixtures: synthetic SF1 lines and a local mirror of the state tree
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zcta_race::core::config::Config;
use zcta_race::ExpectedCounts;

/// Fixed-width geographic header line
pub fn header_line(state: &str, level: &str, logrec: &str, zcta: &str) -> String {
    let mut line = vec![b' '; 400];
    line[0..6].copy_from_slice(b"uSF1  ");
    line[6..8].copy_from_slice(state.as_bytes());
    line[8..11].copy_from_slice(level.as_bytes());
    line[18..25].copy_from_slice(logrec.as_bytes());
    line[160..165].copy_from_slice(zcta.as_bytes());
    String::from_utf8(line).unwrap()
}

/// Segment 00002 line carrying `p8` as the first ten cells of table P8
pub fn population_line(state: &str, logrec: &str, p8: [u32; 10]) -> String {
    let mut fields = vec![
        "uSF1".to_string(),
        state.to_string(),
        "000".to_string(),
        "02".to_string(),
        logrec.to_string(),
    ];
    fields.extend(std::iter::repeat("3".to_string()).take(86 - fields.len()));
    fields.extend(p8.iter().map(|v| v.to_string()));
    fields.extend(std::iter::repeat("0".to_string()).take(27));
    fields.join(",")
}

/// Write a one-member zip archive
pub fn write_zip(path: &Path, member: &str, content: &[u8]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file(member, zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(content).unwrap();
    zip.finish().unwrap();
}

/// One state directory in a mirror
pub struct MirrorState {
    pub dir: String,
    pub abbrev: String,
    pub geo: Option<Vec<String>>,
    pub population: Option<Vec<String>>,
}

impl MirrorState {
    pub fn new(dir: &str, abbrev: &str, geo: Vec<String>, population: Vec<String>) -> Self {
        Self {
            dir: dir.to_string(),
            abbrev: abbrev.to_string(),
            geo: Some(geo),
            population: Some(population),
        }
    }

    pub fn without_population(mut self) -> Self {
        self.population = None;
        self
    }
}

/// Lay out `states` the way the census site does, plus the national and
/// readme entries that sort ahead of the first state
pub fn build_mirror(root: &Path, states: &[MirrorState]) {
    fs::create_dir_all(root.join("0Final_National")).unwrap();
    fs::write(root.join("0README_SF1.txt"), "readme").unwrap();

    for state in states {
        let dir = root.join(&state.dir);
        fs::create_dir_all(&dir).unwrap();
        // Neighbouring segments are present on the real site too
        write_zip(
            &dir.join(format!("{}00001_uf1.zip", state.abbrev)),
            &format!("{}00001.uf1", state.abbrev),
            b"",
        );
        if let Some(geo) = &state.geo {
            write_zip(
                &dir.join(format!("{}geo_uf1.zip", state.abbrev)),
                &format!("{}geo.uf1", state.abbrev),
                geo.join("\r\n").as_bytes(),
            );
        }
        if let Some(population) = &state.population {
            write_zip(
                &dir.join(format!("{}00002_uf1.zip", state.abbrev)),
                &format!("{}00002.uf1", state.abbrev),
                population.join("\r\n").as_bytes(),
            );
        }
    }
}

/// Alabama, and California with the 90210 reference composition
pub fn standard_states() -> Vec<MirrorState> {
    vec![
        MirrorState::new(
            "Alabama",
            "al",
            vec![
                header_line("AL", "040", "0000001", "     "),
                header_line("AL", "871", "0000002", "35004"),
                header_line("AL", "871", "0000003", "350XX"),
            ],
            vec![
                population_line("AL", "0000001", [1000, 990, 700, 250, 10, 10, 0, 10, 10, 10]),
                population_line("AL", "0000002", [100, 100, 80, 20, 0, 0, 0, 0, 0, 0]),
                population_line("AL", "0000003", [5, 5, 5, 0, 0, 0, 0, 0, 0, 0]),
            ],
        ),
        MirrorState::new(
            "California",
            "ca",
            vec![
                header_line("CA", "040", "0000001", "     "),
                header_line("CA", "871", "0000002", "90210"),
                header_line("CA", "871", "0000003", "96000"),
            ],
            vec![
                population_line("CA", "0000001", [9000, 8000, 5000, 1000, 100, 1000, 100, 800, 0, 1000]),
                population_line("CA", "0000002", [400, 390, 200, 100, 20, 50, 20, 0, 0, 10]),
                population_line("CA", "0000003", [0; 10]),
            ],
        ),
    ]
}

/// Counts a build of [`standard_states`] produces
pub const STANDARD_COUNTS: ExpectedCounts = ExpectedCounts {
    geographic_rows: 3,
    race_rows: 6,
};

/// Temporary home holding a mirror, a store and a scratch directory
pub struct TestEnvironment {
    pub dir: TempDir,
}

impl TestEnvironment {
    pub fn new(states: &[MirrorState]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        build_mirror(&dir.path().join("mirror"), states);
        Self { dir }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn mirror(&self) -> PathBuf {
        self.path("mirror")
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.store.store_path = self.path("store/zcta-race.sqlite");
        config.store.scratch_path = self.path("scratch");
        config.store.preserve_scratch_on_failure = false;
        config.source.local_mirror = Some(self.mirror());
        config.source.workers = 2;
        config.validation = STANDARD_COUNTS;
        config
    }
}
