//! Materialization engine
//!
//! [`ResourceCache`] turns a descriptor into a complete cache entry:
//!
//! 1. derive the identity and check the store (no lock on a hit)
//! 2. take the identity's cross-process lock
//! 3. check again, since another holder may have finished meanwhile
//! 4. fetch into a staging area, verify, extract
//! 5. commit the staged content and write the marker
//!
//! Errors leave the entry absent or partial, never complete. The staging
//! area and the lock are released on every exit path.

use super::descriptor::{ATTR_FORMAT, ATTR_SHA256};
use super::{Identity, ResourceDescriptor, ResourceHandle};
use crate::cache::{CacheEntryInfo, CacheStore, CrossProcessLock, EntryState, Installer, Marker};
use crate::error::GetpackResult;
use crate::extract::{self, ArchiveFormat};
use crate::fetch::{verify_sha256, FetchSettings, FetcherRegistry};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default time to wait for another holder of an identity's lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// File name of the downloaded artifact inside a staging area
const DOWNLOAD_FILE: &str = "download";
/// Directory receiving extracted content inside a staging area
const CONTENT_DIR: &str = "content";

/// A cache root together with the transports used to fill it
#[derive(Debug)]
pub struct ResourceCache {
    store: CacheStore,
    locks: CrossProcessLock,
    fetchers: FetcherRegistry,
    lock_timeout: Duration,
}

impl ResourceCache {
    /// Cache at `root` with the default transports and timeouts
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_fetchers(root, FetcherRegistry::with_defaults(FetchSettings::default()))
    }

    /// Cache at `root` using the given transports
    pub fn with_fetchers(root: impl Into<PathBuf>, fetchers: FetcherRegistry) -> Self {
        let store = CacheStore::new(root);
        let locks = CrossProcessLock::new(store.locks_dir());
        Self {
            store,
            locks,
            fetchers,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn fetchers(&self) -> &FetcherRegistry {
        &self.fetchers
    }

    /// Wrap a descriptor in a lazy handle bound to this cache
    pub fn handle(self: &Arc<Self>, descriptor: ResourceDescriptor) -> ResourceHandle {
        ResourceHandle::new(descriptor, Arc::clone(self))
    }

    /// State of the entry for `descriptor`. No lock, no network.
    pub fn status(&self, descriptor: &ResourceDescriptor) -> GetpackResult<EntryState> {
        let identity = Identity::derive(descriptor)?;
        Ok(self.store.status(&identity))
    }

    /// Entries currently under the cache root
    pub fn entries(&self) -> GetpackResult<Vec<CacheEntryInfo>> {
        self.store.entries()
    }

    /// Ensure the entry for `descriptor` is complete and return its path
    pub fn materialize(&self, descriptor: &ResourceDescriptor) -> GetpackResult<PathBuf> {
        let identity = Identity::derive(descriptor)?;
        let target = self.store.resolve_path(&identity);

        if self.store.status(&identity).is_complete() {
            debug!("Cache hit for {} ({})", descriptor.name(), identity);
            return Ok(target);
        }

        // Configuration errors surface before any disk or lock activity
        let source = descriptor.source_url()?;
        let fetcher = self.fetchers.get(source.scheme())?;
        let rules = descriptor.expanded_rules()?;
        let format = descriptor
            .extra(ATTR_FORMAT)
            .map(ArchiveFormat::from_name)
            .transpose()?;

        self.store.ensure_layout()?;
        let _lock = self.locks.acquire(&identity, self.lock_timeout)?;

        if self.store.status(&identity).is_complete() {
            debug!("{} was installed while waiting for the lock", identity);
            return Ok(target);
        }

        let installer = Installer::new(&self.store);
        let staging = installer.staging_area(&identity)?;
        let artifact = staging.path().join(DOWNLOAD_FILE);

        info!(
            "Fetching {} {} from {}",
            descriptor.name(),
            descriptor.version(),
            source
        );
        let fetched = fetcher.fetch(&source, descriptor, &artifact)?;
        if let Some(expected) = descriptor.extra(ATTR_SHA256) {
            verify_sha256(&artifact, expected, source.as_str())?;
        }

        let format = format.unwrap_or_else(|| ArchiveFormat::detect(&fetched.file_name));
        let content = staging.path().join(CONTENT_DIR);
        extract::extract(&artifact, &fetched.file_name, format, &rules, &content)?;

        let marker = Marker {
            identity: identity.to_string(),
            name: descriptor.name().to_string(),
            kind: descriptor.kind().to_string(),
            version: descriptor.version().to_string(),
            source: source.to_string(),
            installed_at: Utc::now(),
        };
        installer.commit(&content, &identity, &marker)
    }

    /// Delete the entry for `descriptor`, returning whether anything existed
    pub fn remove(&self, descriptor: &ResourceDescriptor) -> GetpackResult<bool> {
        let identity = Identity::derive(descriptor)?;
        if self.store.status(&identity) == EntryState::Absent {
            return Ok(false);
        }
        self.store.ensure_layout()?;
        let _lock = self.locks.acquire(&identity, self.lock_timeout)?;
        self.store.remove(&identity)
    }

    /// Delete a scanned entry by identity
    pub fn remove_entry(&self, identity: &Identity) -> GetpackResult<bool> {
        self.store.ensure_layout()?;
        let _lock = self.locks.acquire(identity, self.lock_timeout)?;
        self.store.remove(identity)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::{ErrorKind, GetpackError};
    use crate::extract::tests::write_zip;
    use crate::fetch::tests::{response, serve};
    use crate::fetch::{
        url_file_name, FetchSettings, Fetched, Fetcher, FileFetcher, HttpFetcher,
    };
    use crate::resource::ExtractRule;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use tempfile::TempDir;
    use url::Url;

    /// Serves a small zip for any URL and counts calls
    #[derive(Default)]
    pub(crate) struct CountingFetcher {
        pub calls: AtomicUsize,
        pub delay: Duration,
    }

    impl Fetcher for CountingFetcher {
        fn fetch(
            &self,
            source: &Url,
            _descriptor: &ResourceDescriptor,
            destination: &Path,
        ) -> GetpackResult<Fetched> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            write_zip(destination, &[("bin/example", b"#!/bin/sh\necho example\n")]);
            Ok(Fetched {
                file_name: url_file_name(source).unwrap_or_else(|| "artifact.zip".into()),
                bytes: fs::metadata(destination).map(|m| m.len()).unwrap_or(0),
            })
        }
    }

    /// Always fails like an unreachable host
    #[derive(Default)]
    struct FailingFetcher {
        calls: AtomicUsize,
    }

    impl Fetcher for FailingFetcher {
        fn fetch(&self, source: &Url, _: &ResourceDescriptor, _: &Path) -> GetpackResult<Fetched> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GetpackError::fetch(source.as_str(), "connection refused"))
        }
    }

    pub(crate) fn counting_cache(
        dir: &TempDir,
        delay: Duration,
    ) -> (Arc<ResourceCache>, Arc<CountingFetcher>) {
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
            delay,
        });
        let mut registry = FetcherRegistry::new();
        registry.register("https", fetcher.clone());
        registry.register("file", Arc::new(FileFetcher));
        let cache = ResourceCache::with_fetchers(dir.path().join("cache"), registry)
            .lock_timeout(Duration::from_secs(30));
        (Arc::new(cache), fetcher)
    }

    pub(crate) fn example(version: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(
            "tool",
            version,
            "https://example.com/example-{version}.zip",
        )
        .unwrap()
    }

    #[test]
    fn repeated_materialize_fetches_once() {
        let dir = TempDir::new().unwrap();
        let (cache, fetcher) = counting_cache(&dir, Duration::ZERO);
        let d = example("0.1");

        let first = cache.materialize(&d).unwrap();
        let second = cache.materialize(&d).unwrap();

        assert_eq!(first, second);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(first.join("bin/example").is_file());
        assert_eq!(cache.status(&d).unwrap(), EntryState::Complete);
    }

    #[test]
    fn separate_caches_on_same_root_share_entry() {
        let dir = TempDir::new().unwrap();
        let (a, fetch_a) = counting_cache(&dir, Duration::ZERO);
        let (b, fetch_b) = counting_cache(&dir, Duration::ZERO);
        let d = example("0.1");

        assert_eq!(a.materialize(&d).unwrap(), b.materialize(&d).unwrap());
        assert_eq!(
            fetch_a.calls.load(Ordering::SeqCst) + fetch_b.calls.load(Ordering::SeqCst),
            1
        );
    }

    #[test]
    fn concurrent_materialize_installs_once() {
        const WORKERS: usize = 8;
        let dir = TempDir::new().unwrap();
        let (cache, fetcher) = counting_cache(&dir, Duration::from_millis(100));
        let barrier = Arc::new(Barrier::new(WORKERS));

        let threads: Vec<_> = (0..WORKERS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.materialize(&example("0.1")).unwrap()
                })
            })
            .collect();

        let paths: Vec<PathBuf> = threads.into_iter().map(|t| t.join().unwrap()).collect();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(paths.iter().all(|p| p == &paths[0]));
        assert!(paths[0].join("bin/example").is_file());
    }

    #[test]
    fn versions_are_isolated() {
        let dir = TempDir::new().unwrap();
        let (cache, fetcher) = counting_cache(&dir, Duration::ZERO);

        let old = cache.materialize(&example("0.1")).unwrap();
        let new = cache.materialize(&example("0.2")).unwrap();

        assert_ne!(old, new);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(old.join("bin/example").is_file());
        assert!(new.join("bin/example").is_file());
    }

    #[test]
    fn partial_entry_is_replaced() {
        let dir = TempDir::new().unwrap();
        let (cache, fetcher) = counting_cache(&dir, Duration::ZERO);
        let d = example("0.1");
        let target = cache
            .store()
            .resolve_path(&Identity::derive(&d).unwrap());
        fs::create_dir_all(target.join("bin")).unwrap();
        fs::write(target.join("bin/leftover"), b"interrupted").unwrap();
        assert_eq!(cache.status(&d).unwrap(), EntryState::Partial);

        let path = cache.materialize(&d).unwrap();

        assert_eq!(path, target);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(!target.join("bin/leftover").exists());
        assert_eq!(cache.status(&d).unwrap(), EntryState::Complete);
    }

    #[test]
    fn held_lock_times_out() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let mut registry = FetcherRegistry::new();
        registry.register("https", fetcher.clone());
        let cache = ResourceCache::with_fetchers(dir.path().join("cache"), registry)
            .lock_timeout(Duration::from_millis(150));
        let d = example("0.1");
        let identity = Identity::derive(&d).unwrap();

        cache.store().ensure_layout().unwrap();
        let other = CrossProcessLock::new(cache.store().locks_dir());
        let _held = other.acquire(&identity, Duration::from_secs(1)).unwrap();

        let err = cache.materialize(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LockTimeout);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(!cache.status(&d).unwrap().is_complete());
    }

    #[test]
    fn failed_fetch_leaves_no_entry() {
        let dir = TempDir::new().unwrap();
        let mut registry = FetcherRegistry::new();
        let failing = Arc::new(FailingFetcher::default());
        registry.register("https", failing.clone());
        let cache = ResourceCache::with_fetchers(dir.path().join("cache"), registry);
        let d = example("0.1");

        let err = cache.materialize(&d).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Fetch);
        assert_eq!(cache.status(&d).unwrap(), EntryState::Absent);
        let staged = fs::read_dir(cache.store().staging_dir()).unwrap().count();
        assert_eq!(staged, 0);
    }

    #[test]
    fn unknown_scheme_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let (cache, _) = counting_cache(&dir, Duration::ZERO);
        let d = ResourceDescriptor::new("tool", "1", "ftp://host/tool.zip").unwrap();

        let err = cache.materialize(&d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!cache.root().exists());
    }

    #[test]
    fn file_source_with_extract_rules() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("tool-1.0.zip");
        write_zip(
            &archive,
            &[
                ("tool-1.0/bin/tool", b"binary"),
                ("tool-1.0/README", b"docs"),
                ("other/skip", b"ignored"),
            ],
        );
        let (cache, _) = counting_cache(&dir, Duration::ZERO);
        let dir_url = Url::from_directory_path(dir.path()).unwrap();
        let source = format!("{}tool-{{version}}.zip", dir_url);
        let d = ResourceDescriptor::new("tool", "1.0", source)
            .unwrap()
            .with_extract_rules(vec![ExtractRule::new("tool-{version}/bin/", "bin")]);

        let path = cache.materialize(&d).unwrap();

        assert_eq!(fs::read(path.join("bin/tool")).unwrap(), b"binary");
        assert!(!path.join("README").exists());
        assert!(!path.join("other").exists());
    }

    #[test]
    fn http_source_is_fetched_once() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("served.zip");
        write_zip(&archive, &[("tool-2.0/bin/tool", b"binary")]);
        let body = fs::read(&archive).unwrap();
        let (base, server) = serve(vec![response(
            "200 OK",
            &[("Content-Length", body.len().to_string())],
            &body,
        )]);

        let mut registry = FetcherRegistry::new();
        registry.register("http", Arc::new(HttpFetcher::new(FetchSettings::default())));
        let cache = ResourceCache::with_fetchers(dir.path().join("cache"), registry);
        let d = ResourceDescriptor::new("tool", "2.0", format!("{}/tool-{{version}}.zip", base))
            .unwrap()
            .with_extract_rules(vec![ExtractRule::new("tool-{version}/", "")]);

        let first = cache.materialize(&d).unwrap();
        let second = cache.materialize(&d).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read(first.join("bin/tool")).unwrap(), b"binary");
        assert_eq!(server.join().unwrap(), vec!["GET /tool-2.0.zip HTTP/1.1"]);
    }

    #[test]
    fn checksum_mismatch_is_fetch_error() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("tool");
        fs::write(&artifact, b"binary").unwrap();
        let (cache, _) = counting_cache(&dir, Duration::ZERO);
        let url = Url::from_file_path(&artifact).unwrap();
        let d = ResourceDescriptor::new("tool", "1.0", url.as_str())
            .unwrap()
            .with_extra(ATTR_SHA256, "0".repeat(64));

        let err = cache.materialize(&d).unwrap_err();
        assert!(matches!(err, GetpackError::ChecksumMismatch { .. }));
        assert_eq!(cache.status(&d).unwrap(), EntryState::Absent);
    }

    #[test]
    fn remove_deletes_entry() {
        let dir = TempDir::new().unwrap();
        let (cache, fetcher) = counting_cache(&dir, Duration::ZERO);
        let d = example("0.1");

        assert!(!cache.remove(&d).unwrap());
        let path = cache.materialize(&d).unwrap();
        assert!(cache.remove(&d).unwrap());
        assert!(!path.exists());
        assert_eq!(cache.status(&d).unwrap(), EntryState::Absent);

        cache.materialize(&d).unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn entries_lists_installed_resources() {
        let dir = TempDir::new().unwrap();
        let (cache, _) = counting_cache(&dir, Duration::ZERO);
        cache.materialize(&example("0.1")).unwrap();
        cache.materialize(&example("0.2")).unwrap();

        let entries = cache.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.state.is_complete()));
        let versions: Vec<_> = entries
            .iter()
            .filter_map(|e| e.marker.as_ref().map(|m| m.version.as_str()))
            .collect();
        assert!(versions.contains(&"0.1") && versions.contains(&"0.2"));
    }
}
