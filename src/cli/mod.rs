//! Command-line interface

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};

use crate::catalog::Catalog;
use crate::config::{resolve_cache_root, Config, ConfigManager};
use crate::error::GetpackResult;
use crate::fetch::FetcherRegistry;
use crate::resource::{Overrides, ResourceCache, ResourceDescriptor};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, assembled once from flags and config
pub struct AppContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub catalog: Catalog,
    pub cache: Arc<ResourceCache>,
}

impl AppContext {
    /// Config manager for `--config`, or the default location
    pub fn config_manager(cli: &Cli) -> ConfigManager {
        match &cli.config {
            Some(path) => ConfigManager::with_path(path.clone()),
            None => ConfigManager::new(),
        }
    }

    /// Load the catalog and set up the cache. No cache I/O happens here.
    pub fn new(cli: &Cli, config: Config, config_path: PathBuf) -> GetpackResult<Self> {
        let mut catalog = Catalog::builtin()?;
        if let Some(path) = cli.catalog.as_ref().or(config.catalog.path.as_ref()) {
            catalog.merge(Catalog::load(path)?);
        }

        let root = resolve_cache_root(cli.cache_dir.as_deref(), &config)?;
        debug!("Cache root: {}", root.display());
        let fetchers = FetcherRegistry::with_defaults(config.fetch_settings());
        let cache =
            ResourceCache::with_fetchers(root, fetchers).lock_timeout(config.lock_timeout());

        Ok(Self {
            config,
            config_path,
            catalog,
            cache: Arc::new(cache),
        })
    }

    /// Catalog descriptor for `name`, optionally at another version
    pub fn descriptor(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> GetpackResult<ResourceDescriptor> {
        let overrides = version.map(Overrides::version).unwrap_or_default();
        self.catalog.descriptor(name, &overrides)
    }
}
