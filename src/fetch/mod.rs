//! Fetching remote content into the staging area
//!
//! A [`Fetcher`] streams one artifact to a temporary file outside the final
//! cache location. Fetchers are looked up by URL scheme in a
//! [`FetcherRegistry`], which callers can extend with their own transports.
//! There is no retry policy here.

mod file;
mod http;
mod pypi;

pub use file::FileFetcher;
pub use http::HttpFetcher;
pub use pypi::{default_platform_tag, select_release, PypiFetcher, ReleaseFile};

use crate::error::{GetpackError, GetpackResult};
use crate::resource::ResourceDescriptor;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Result of a successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Artifact file name, used to pick an extractor (e.g. `tool-1.0.zip`)
    pub file_name: String,
    /// Bytes written to the destination
    pub bytes: u64,
}

/// Retrieves the content behind a source URL
pub trait Fetcher: Send + Sync {
    /// Write the artifact for `source` to `destination`.
    ///
    /// On error the destination may hold partial data; the caller discards it.
    fn fetch(
        &self,
        source: &Url,
        descriptor: &ResourceDescriptor,
        destination: &Path,
    ) -> GetpackResult<Fetched>;
}

/// Timeouts applied to network transports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// Whole-request timeout, including the body transfer
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Scheme → fetcher lookup
#[derive(Clone, Default)]
pub struct FetcherRegistry {
    fetchers: HashMap<String, Arc<dyn Fetcher>>,
}

impl FetcherRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `http`, `https`, `file` and `pypi` transports
    pub fn with_defaults(settings: FetchSettings) -> Self {
        let http = Arc::new(HttpFetcher::new(settings));
        let mut registry = Self::new();
        registry.register("http", http.clone());
        registry.register("https", http.clone());
        registry.register("file", Arc::new(FileFetcher));
        registry.register("pypi", Arc::new(PypiFetcher::new(http)));
        registry
    }

    /// Register (or replace) the fetcher for `scheme`
    pub fn register(&mut self, scheme: impl Into<String>, fetcher: Arc<dyn Fetcher>) {
        self.fetchers
            .insert(scheme.into().to_ascii_lowercase(), fetcher);
    }

    pub fn get(&self, scheme: &str) -> GetpackResult<Arc<dyn Fetcher>> {
        self.fetchers
            .get(&scheme.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| GetpackError::UnsupportedScheme(scheme.to_string()))
    }

    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.fetchers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }
}

impl fmt::Debug for FetcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetcherRegistry")
            .field("schemes", &self.schemes())
            .finish()
    }
}

/// Last path segment of a URL, if any
pub fn url_file_name(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// SHA-256 of a file as lowercase hex
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Fail with `ChecksumMismatch` unless `path` hashes to `expected`
pub fn verify_sha256(path: &Path, expected: &str, url: &str) -> GetpackResult<()> {
    let actual = sha256_file(path)
        .map_err(|e| GetpackError::io(format!("hashing {}", path.display()), e))?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(GetpackError::ChecksumMismatch {
            url: url.to_string(),
            expected: expected.trim().to_ascii_lowercase(),
            actual,
        })
    }
}
