//! getpack - lazy, idempotent materialization of external resources
//!
//! Declare a resource (kind, version, source), ask for it, and get a local
//! path. The first request downloads and installs it into a shared cache;
//! every later request, from any thread or process, reuses the install.
//!
//! ```rust,ignore
//! use getpack::{Catalog, Overrides, ResourceCache};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(ResourceCache::new("/var/cache/getpack"));
//! let ffmpeg = Catalog::builtin()?.descriptor("ffmpeg", &Overrides::default())?;
//! let path = cache.handle(ffmpeg).activate()?;
//! ```

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod executable;
pub mod extract;
pub mod fetch;
pub mod resource;
pub mod ui;

pub use catalog::Catalog;
pub use error::{ErrorKind, GetpackError, GetpackResult};
pub use executable::Executable;
pub use resource::{Identity, Overrides, ResourceCache, ResourceDescriptor, ResourceHandle};
