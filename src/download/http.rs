//! HTTP(S) access to the published tree through the server's directory index.

use super::source::RemoteSource;
use crate::{Result, ZctaError};
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

static HREF: OnceLock<Regex> = OnceLock::new();

fn href_pattern() -> &'static Regex {
    HREF.get_or_init(|| {
        Regex::new(r#"(?i)<a\s+[^>]*?href\s*=\s*"([^"]+)""#).expect("static regex is valid")
    })
}

/// One entry of a directory index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Extract the child entries from an autoindex HTML page. Sorting links,
/// parent links and absolute links are ignored.
pub fn parse_index(html: &str) -> Vec<IndexEntry> {
    href_pattern()
        .captures_iter(html)
        .filter_map(|caps| {
            let href = caps.get(1)?.as_str();
            if href.starts_with('?')
                || href.starts_with('/')
                || href.starts_with('#')
                || href.starts_with("..")
                || href.contains("://")
            {
                return None;
            }
            let is_dir = href.ends_with('/');
            let name = percent_decode_str(href.trim_end_matches('/'))
                .decode_utf8_lossy()
                .into_owned();
            if name.is_empty() || name.contains('/') {
                return None;
            }
            Some(IndexEntry { name, is_dir })
        })
        .collect()
}

pub struct HttpSource {
    client: Client,
    root: Url,
}

impl HttpSource {
    pub fn new(base_url: &str, base_path: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ZctaError::Config(format!("Invalid base_url {}: {}", base_url, e)))?;
        let root = base
            .join(&format!("{}/", base_path.trim_matches('/')))
            .map_err(|e| ZctaError::Config(format!("Invalid base_path {}: {}", base_path, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .user_agent(concat!("zcta-race/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, root })
    }

    fn dir_url(&self, state: &str) -> Result<Url> {
        self.root
            .join(&format!("{}/", state))
            .map_err(|e| ZctaError::Config(format!("Invalid state directory {}: {}", state, e)))
    }

    fn index(&self, url: &Url) -> Result<Vec<IndexEntry>> {
        debug!("Listing {}", url);
        let response = self.client.get(url.clone()).send()?;
        match response.status() {
            status if status.is_success() => Ok(parse_index(&response.text()?)),
            StatusCode::NOT_FOUND => Err(ZctaError::MissingExpectedFile(url.to_string())),
            status => Err(ZctaError::SourceUnavailable(format!("{} returned {}", url, status))),
        }
    }
}

impl RemoteSource for HttpSource {
    fn describe(&self) -> String {
        self.root.to_string()
    }

    fn list_states(&self) -> Result<Vec<String>> {
        let entries = match self.index(&self.root) {
            Err(ZctaError::MissingExpectedFile(url)) => {
                return Err(ZctaError::SourceUnavailable(format!("{} not found", url)))
            }
            other => other?,
        };
        Ok(entries.into_iter().filter(|e| e.is_dir).map(|e| e.name).collect())
    }

    fn list_files(&self, state: &str) -> Result<Vec<String>> {
        let url = self.dir_url(state)?;
        Ok(self
            .index(&url)?
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.name)
            .collect())
    }

    fn fetch(&self, state: &str, filename: &str, dest: &Path) -> Result<u64> {
        let url = self
            .dir_url(state)?
            .join(filename)
            .map_err(|e| ZctaError::Config(format!("Invalid filename {}: {}", filename, e)))?;

        let mut response = self.client.get(url.clone()).send()?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ZctaError::MissingExpectedFile(url.to_string())),
            status => {
                return Err(ZctaError::SourceUnavailable(format!("{} returned {}", url, status)))
            }
        }

        let copied = (|| -> Result<u64> {
            let mut writer = BufWriter::new(File::create(dest)?);
            let bytes = response.copy_to(&mut writer)?;
            writer.flush()?;
            Ok(bytes)
        })();

        if copied.is_err() {
            fs::remove_file(dest).ok();
        }
        copied
    }
}
