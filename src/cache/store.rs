//! Cache entry layout and state detection
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/<identity>/...                   installed content
//! <root>/<identity>/.getpack-complete.json completion marker (written last)
//! <root>/.locks/<identity>.lock           per-identity lock files
//! <root>/.staging/                        downloads and unpacked staging dirs
//! ```
//!
//! A directory without the marker is never considered usable.

use crate::error::{GetpackError, GetpackResult};
use crate::resource::Identity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// File name of the completion marker inside an entry
pub const MARKER_FILE: &str = ".getpack-complete.json";
/// Directory holding lock files
pub const LOCKS_DIR: &str = ".locks";
/// Directory holding downloads and staging dirs
pub const STAGING_DIR: &str = ".staging";

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// State of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// No directory for this identity
    Absent,
    /// Directory exists without a marker (interrupted install)
    Partial,
    /// Marker present, entry is immutable
    Complete,
}

impl EntryState {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for EntryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Partial => write!(f, "partial"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Metadata recorded in the completion marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub identity: String,
    pub name: String,
    pub kind: String,
    pub version: String,
    pub source: String,
    pub installed_at: DateTime<Utc>,
}

/// A cache entry found by scanning the root
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub identity: Identity,
    pub path: PathBuf,
    pub state: EntryState,
    /// Present only for complete entries with a readable marker
    pub marker: Option<Marker>,
    pub size_bytes: u64,
}

/// Maps identities to directories under one cache root
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for `identity`. Pure path computation.
    pub fn resolve_path(&self, identity: &Identity) -> PathBuf {
        self.root.join(identity.as_str())
    }

    pub fn marker_path(&self, identity: &Identity) -> PathBuf {
        self.resolve_path(identity).join(MARKER_FILE)
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join(LOCKS_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Create the root and its reserved directories
    pub fn ensure_layout(&self) -> GetpackResult<()> {
        for dir in [self.root.clone(), self.locks_dir(), self.staging_dir()] {
            fs::create_dir_all(&dir).map_err(|e| GetpackError::CacheRootUnusable {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Current state of the entry. Read-only; safe without the lock because
    /// the marker only ever appears atomically.
    pub fn status(&self, identity: &Identity) -> EntryState {
        if self.marker_path(identity).is_file() {
            EntryState::Complete
        } else if self.resolve_path(identity).exists() {
            EntryState::Partial
        } else {
            EntryState::Absent
        }
    }

    /// Read the marker of a complete entry
    pub fn read_marker(&self, identity: &Identity) -> GetpackResult<Option<Marker>> {
        let path = self.marker_path(identity);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GetpackError::io(
                    format!("reading marker {}", path.display()),
                    e,
                ))
            }
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Scan the root for entries. A missing root yields an empty list.
    pub fn entries(&self) -> GetpackResult<Vec<CacheEntryInfo>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(GetpackError::io(
                    format!("reading cache root {}", self.root.display()),
                    e,
                ))
            }
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry.map_err(|e| GetpackError::io("scanning cache root", e))?;
            if !dir_entry.path().is_dir() {
                continue;
            }
            let file_name = dir_entry.file_name();
            let Some(identity) = file_name.to_str().and_then(Identity::from_dir_name) else {
                continue;
            };

            let state = self.status(&identity);
            let marker = if state.is_complete() {
                self.read_marker(&identity).unwrap_or_else(|e| {
                    warn!("Unreadable marker for {}: {}", identity, e);
                    None
                })
            } else {
                None
            };

            entries.push(CacheEntryInfo {
                path: dir_entry.path(),
                size_bytes: dir_size(&dir_entry.path()),
                identity,
                state,
                marker,
            });
        }

        entries.sort_by(|a, b| a.identity.cmp(&b.identity));
        debug!("Found {} cache entries", entries.len());
        Ok(entries)
    }

    /// Remove an entry. The caller must hold the identity's lock.
    ///
    /// The marker goes first so an interrupted removal leaves a partial
    /// entry, never a complete-looking one with missing files.
    pub fn remove(&self, identity: &Identity) -> GetpackResult<bool> {
        let path = self.resolve_path(identity);
        if !path.exists() {
            return Ok(false);
        }

        match fs::remove_file(self.marker_path(identity)) {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => {
                return Err(GetpackError::io(
                    format!("removing marker of {}", identity),
                    e,
                ))
            }
        }

        fs::remove_dir_all(&path)
            .map_err(|e| GetpackError::io(format!("removing {}", path.display()), e))?;
        debug!("Removed cache entry {}", path.display());
        Ok(true)
    }

    /// Delete staging leftovers (from crashed processes) older than `max_age`
    pub fn prune_staging(&self, max_age: Duration) -> GetpackResult<usize> {
        let staging = self.staging_dir();
        let read_dir = match fs::read_dir(&staging) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(GetpackError::io("reading staging dir", e)),
        };

        let now = SystemTime::now();
        let mut removed = 0;
        for dir_entry in read_dir.flatten() {
            let path = dir_entry.path();
            let age = dir_entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .map(|modified| now.duration_since(modified).unwrap_or(Duration::ZERO));
            if !age.is_some_and(|age| age >= max_age) {
                continue;
            }
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to prune {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

/// Total size of regular files below `path`
fn dir_size(path: &Path) -> u64 {
    let Ok(read_dir) = fs::read_dir(path) else {
        return 0;
    };
    read_dir
        .flatten()
        .map(|entry| match entry.file_type() {
            Ok(t) if t.is_dir() => dir_size(&entry.path()),
            Ok(t) if t.is_file() => entry.metadata().map(|m| m.len()).unwrap_or(0),
            _ => 0,
        })
        .sum()
}
