//! `pypi://<project>` transport
//!
//! Resolves the descriptor's version against the Python Package Index JSON
//! API, picks a release file for the platform, then downloads it over HTTP.
//! The digest published by the index is verified after the download.

use super::{verify_sha256, Fetched, Fetcher, HttpFetcher};
use crate::error::{GetpackError, GetpackResult};
use crate::resource::descriptor::ATTR_PLATFORM;
use crate::resource::ResourceDescriptor;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use url::Url;

const DEFAULT_INDEX: &str = "https://pypi.org/pypi";

/// One downloadable file of a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseFile {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub python_version: String,
    #[serde(default)]
    pub digests: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    #[serde(default)]
    releases: HashMap<String, Vec<ReleaseFile>>,
}

/// Platform tag used when the descriptor has no `platform` attribute
///
/// `*` matches any run of characters, so one tag covers every
/// `manylinux` flavour of an architecture.
pub fn default_platform_tag() -> &'static str {
    match (std::env::consts::OS, std::env::consts::ARCH) {
        ("windows", "x86_64") => "win_amd64",
        ("windows", "x86") => "win32",
        ("windows", "aarch64") => "win_arm64",
        ("macos", "aarch64") => "macosx*arm64",
        ("macos", _) => "macosx*x86_64",
        ("linux", "aarch64") => "manylinux*_aarch64",
        ("linux", "x86_64") => "manylinux*_x86_64",
        ("linux", "x86") => "manylinux*_i686",
        _ => "any",
    }
}

fn is_universal(filename: &str) -> bool {
    filename.contains("-none-any.") || filename.contains("-any.")
}

/// Platform part of a wheel name (`manylinux_2_17_x86_64` in
/// `pkg-1.0-cp311-cp311-manylinux_2_17_x86_64.whl`); other files match whole
fn platform_part(filename: &str) -> &str {
    filename
        .strip_suffix(".whl")
        .and_then(|stem| stem.rsplit('-').next())
        .unwrap_or(filename)
}

/// Does `text` contain the pieces of `pattern`, split at `*`, in order?
fn tag_matches(text: &str, pattern: &str) -> bool {
    let mut rest = text;
    for piece in pattern.split('*').filter(|p| !p.is_empty()) {
        match rest.find(piece) {
            Some(pos) => rest = &rest[pos + piece.len()..],
            None => return false,
        }
    }
    true
}

/// Choose the file to install from a release
///
/// A release consisting of a single source distribution is used as is.
/// Otherwise platform-specific files win over universal (`any`) ones.
pub fn select_release<'a>(files: &'a [ReleaseFile], platform: &str) -> Option<&'a ReleaseFile> {
    if let [only] = files {
        if only.python_version == "source" {
            return Some(only);
        }
    }
    files
        .iter()
        .find(|f| tag_matches(platform_part(&f.filename), platform))
        .or_else(|| files.iter().find(|f| is_universal(&f.filename)))
}

/// Fetches wheels and sdists from a PyPI-compatible JSON index
pub struct PypiFetcher {
    http: Arc<HttpFetcher>,
    index: String,
}

impl PypiFetcher {
    pub fn new(http: Arc<HttpFetcher>) -> Self {
        Self::with_index(http, DEFAULT_INDEX)
    }

    /// Use a different JSON index base URL
    pub fn with_index(http: Arc<HttpFetcher>, index: impl Into<String>) -> Self {
        Self {
            http,
            index: index.into().trim_end_matches('/').to_string(),
        }
    }

    fn project_name(source: &Url) -> GetpackResult<String> {
        let name = source
            .host_str()
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| source.path().trim_matches('/').to_string());
        if name.is_empty() {
            return Err(GetpackError::SourceInvalid {
                source_url: source.to_string(),
                reason: "expected pypi://<project>".to_string(),
            });
        }
        Ok(name)
    }
}

impl Fetcher for PypiFetcher {
    fn fetch(
        &self,
        source: &Url,
        descriptor: &ResourceDescriptor,
        destination: &Path,
    ) -> GetpackResult<Fetched> {
        let project = Self::project_name(source)?;
        let version = descriptor.version();
        let info: ProjectInfo = self
            .http
            .get_json(&format!("{}/{}/json", self.index, project))?;

        let files = info
            .releases
            .get(version)
            .ok_or_else(|| GetpackError::ReleaseNotFound {
                project: project.clone(),
                version: version.to_string(),
                reason: "version not published".to_string(),
            })?;
        debug!(
            "Available files for {} {}: {}",
            project,
            version,
            files
                .iter()
                .map(|f| f.filename.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let platform = descriptor
            .extra(ATTR_PLATFORM)
            .unwrap_or_else(|| default_platform_tag());
        let file = select_release(files, platform).ok_or_else(|| {
            GetpackError::ReleaseNotFound {
                project: project.clone(),
                version: version.to_string(),
                reason: format!("no file for platform '{}'", platform),
            }
        })?;

        let bytes = self.http.download(&file.url, destination)?;
        if let Some(expected) = file.digests.get("sha256") {
            verify_sha256(destination, expected, &file.url)?;
        }

        Ok(Fetched {
            file_name: file.filename.clone(),
            bytes,
        })
    }
}
