//! Lazy, memoized access to one resource

use super::{Identity, ResourceCache, ResourceDescriptor};
use crate::error::{GetpackError, GetpackResult};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Lifecycle of a [`ResourceHandle`]
#[derive(Debug, Clone)]
pub enum HandleState {
    /// Nothing attempted yet
    Unactivated,
    /// Entry is complete at this path
    Activated(PathBuf),
    /// Activation failed; the error is returned on every later call
    Failed(Arc<GetpackError>),
}

/// Runtime handle for a declared resource
///
/// Nothing touches the disk or network until [`activate`](Self::activate).
/// The outcome of the first activation is remembered: success returns the
/// same path without I/O, failure returns the same error without a new
/// fetch. Build a new handle to retry after a failure.
#[derive(Debug)]
pub struct ResourceHandle {
    descriptor: ResourceDescriptor,
    cache: Arc<ResourceCache>,
    state: Mutex<HandleState>,
}

impl ResourceHandle {
    pub fn new(descriptor: ResourceDescriptor, cache: Arc<ResourceCache>) -> Self {
        Self {
            descriptor,
            cache,
            state: Mutex::new(HandleState::Unactivated),
        }
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn cache(&self) -> &Arc<ResourceCache> {
        &self.cache
    }

    /// Cache identity of the wrapped descriptor. Pure, no I/O.
    pub fn identity(&self) -> GetpackResult<Identity> {
        Identity::derive(&self.descriptor)
    }

    /// Materialize the resource if needed and return its local path
    ///
    /// Concurrent calls on one handle serialize; only the first does work.
    pub fn activate(&self) -> GetpackResult<PathBuf> {
        let mut state = self.lock_state();
        match &*state {
            HandleState::Activated(path) => Ok(path.clone()),
            HandleState::Failed(error) => Err(GetpackError::Shared(Arc::clone(error))),
            HandleState::Unactivated => match self.cache.materialize(&self.descriptor) {
                Ok(path) => {
                    *state = HandleState::Activated(path.clone());
                    Ok(path)
                }
                Err(e) => {
                    debug!("Activation of {} failed: {}", self.descriptor.name(), e);
                    let shared = Arc::new(e);
                    *state = HandleState::Failed(Arc::clone(&shared));
                    Err(GetpackError::Shared(shared))
                }
            },
        }
    }

    /// Path of an activated handle
    pub fn path(&self) -> Option<PathBuf> {
        match &*self.lock_state() {
            HandleState::Activated(path) => Some(path.clone()),
            _ => None,
        }
    }

    pub fn state(&self) -> HandleState {
        self.lock_state().clone()
    }

    pub fn is_activated(&self) -> bool {
        matches!(*self.lock_state(), HandleState::Activated(_))
    }

    fn lock_state(&self) -> MutexGuard<'_, HandleState> {
        // state stays consistent even if a holder panicked mid-activation
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
