//! Resource declarations and their materialization
//!
//! A [`ResourceDescriptor`] says what a resource is. A [`ResourceHandle`]
//! turns it into a local path on demand through a shared [`ResourceCache`].

pub mod descriptor;
pub mod engine;
pub mod handle;
pub mod identity;
pub mod template;

pub use descriptor::{ExtractRule, Overrides, ResourceDescriptor};
pub use engine::{ResourceCache, DEFAULT_LOCK_TIMEOUT};
pub use handle::{HandleState, ResourceHandle};
pub use identity::Identity;
