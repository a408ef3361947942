//! Cross-process locks scoped to one identity
//!
//! Each identity gets its own lock file under `<root>/.locks/`, locked with
//! an OS advisory lock (`flock` on Unix, `LockFileEx` on Windows). The OS
//! drops the lock when the holding process dies, so a crashed installer never
//! leaves a poisoned lock behind. Lock files themselves are never deleted:
//! unlinking a lock file while another process waits on it would split the
//! lock in two.
//!
//! Locks are not re-entrant. Acquiring the same identity twice from one
//! process blocks until the timeout.

use crate::error::{GetpackError, GetpackResult};
use crate::resource::Identity;
use fs4::fs_std::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// First retry delay while waiting for a contended lock
const INITIAL_BACKOFF: Duration = Duration::from_millis(10);
/// Upper bound for the retry delay
const MAX_BACKOFF: Duration = Duration::from_millis(250);

/// Factory for per-identity locks below one directory
#[derive(Debug, Clone)]
pub struct CrossProcessLock {
    dir: PathBuf,
}

/// A held lock. Released on drop.
#[derive(Debug)]
pub struct LockHandle {
    file: File,
    identity: Identity,
    path: PathBuf,
}

impl CrossProcessLock {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn lock_path(&self, identity: &Identity) -> PathBuf {
        self.dir.join(format!("{}.lock", identity))
    }

    /// Block until the lock for `identity` is held or `timeout` expires
    pub fn acquire(&self, identity: &Identity, timeout: Duration) -> GetpackResult<LockHandle> {
        let path = self.lock_path(identity);
        let file = open_lock_file(&path)?;
        let deadline = Instant::now() + timeout;
        let mut backoff = INITIAL_BACKOFF;
        let mut waited = false;

        loop {
            match FileExt::try_lock_exclusive(&file) {
                Ok(()) => {
                    if waited {
                        debug!("Acquired lock {} after waiting", path.display());
                    } else {
                        trace!("Acquired lock {}", path.display());
                    }
                    return Ok(LockHandle {
                        file,
                        identity: identity.clone(),
                        path,
                    });
                }
                Err(e) if is_contended(&e) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(GetpackError::LockTimeout {
                            identity: identity.to_string(),
                            timeout,
                        });
                    }
                    if !waited {
                        debug!("Waiting for lock on {}", identity);
                        waited = true;
                    }
                    thread::sleep(backoff.min(deadline - now));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                Err(e) => {
                    return Err(GetpackError::LockUnavailable { path, source: e });
                }
            }
        }
    }

    /// Take the lock only if it is free right now
    pub fn try_acquire(&self, identity: &Identity) -> GetpackResult<Option<LockHandle>> {
        let path = self.lock_path(identity);
        let file = open_lock_file(&path)?;
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(LockHandle {
                file,
                identity: identity.clone(),
                path,
            })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(GetpackError::LockUnavailable { path, source: e }),
        }
    }
}

impl LockHandle {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release explicitly. Equivalent to dropping the handle.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            // closing the file below releases it anyway
            debug!("Unlock of {} failed: {}", self.path.display(), e);
        }
        trace!("Released lock {}", self.path.display());
    }
}

fn open_lock_file(path: &Path) -> GetpackResult<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GetpackError::LockUnavailable {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| GetpackError::LockUnavailable {
            path: path.to_path_buf(),
            source: e,
        })
}

fn is_contended(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // ERROR_LOCK_VIOLATION
    cfg!(windows) && err.raw_os_error() == Some(33)
}
