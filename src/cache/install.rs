//! Atomic installation of staged content
//!
//! Content is unpacked under `<root>/.staging/`, next to (never inside) the
//! final entry, then moved into place with one rename. The completion marker
//! is written afterwards. A crash before the marker leaves a partial entry
//! that the next attempt replaces; a crash after it leaves a complete entry
//! that is never touched again.

use super::store::{CacheStore, EntryState, Marker, MARKER_FILE};
use crate::error::{GetpackError, GetpackResult};
use crate::resource::Identity;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};
use tracing::{debug, info, warn};

/// Moves staged content into a [`CacheStore`]
#[derive(Debug, Clone, Copy)]
pub struct Installer<'a> {
    store: &'a CacheStore,
}

impl<'a> Installer<'a> {
    pub fn new(store: &'a CacheStore) -> Self {
        Self { store }
    }

    /// Create a fresh staging area for one materialization attempt.
    ///
    /// The directory is removed when the returned value is dropped, whether
    /// the attempt succeeded or not.
    pub fn staging_area(&self, identity: &Identity) -> GetpackResult<TempDir> {
        let staging = self.store.staging_dir();
        fs::create_dir_all(&staging).map_err(|e| GetpackError::CacheRootUnusable {
            path: staging.clone(),
            source: e,
        })?;
        Builder::new()
            .prefix(&format!("{}-", identity))
            .tempdir_in(&staging)
            .map_err(|e| GetpackError::CacheRootUnusable {
                path: staging,
                source: e,
            })
    }

    /// Move `content` into the entry for `identity` and mark it complete.
    ///
    /// The caller must hold the identity's lock. An existing partial entry is
    /// replaced; an existing complete entry is kept and `content` discarded.
    pub fn commit(
        &self,
        content: &Path,
        identity: &Identity,
        marker: &Marker,
    ) -> GetpackResult<PathBuf> {
        let target = self.store.resolve_path(identity);

        match self.store.status(identity) {
            EntryState::Complete => {
                debug!("{} already complete, discarding staged content", identity);
                return Ok(target);
            }
            EntryState::Partial => {
                warn!("Replacing partial cache entry {}", target.display());
                fs::remove_dir_all(&target).map_err(|e| {
                    GetpackError::install(identity.as_str(), "removing partial entry", e)
                })?;
            }
            EntryState::Absent => {}
        }

        fs::rename(content, &target).map_err(|e| {
            GetpackError::install(
                identity.as_str(),
                format!("moving staged content to {}", target.display()),
                e,
            )
        })?;

        write_marker(&target, identity, marker)?;
        info!("Installed {} {} to {}", marker.name, marker.version, target.display());
        Ok(target)
    }
}

/// Write the marker through a temp file + rename so it appears atomically
fn write_marker(entry: &Path, identity: &Identity, marker: &Marker) -> GetpackResult<()> {
    let content = serde_json::to_vec_pretty(marker)?;
    let install_err =
        |context: &str, e: std::io::Error| GetpackError::install(identity.as_str(), context, e);

    let mut temp = Builder::new()
        .prefix(".marker-")
        .tempfile_in(entry)
        .map_err(|e| install_err("creating marker", e))?;
    temp.write_all(&content)
        .map_err(|e| install_err("writing marker", e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| install_err("syncing marker", e))?;
    temp.persist(entry.join(MARKER_FILE))
        .map_err(|e| install_err("persisting marker", e.error))?;
    Ok(())
}
