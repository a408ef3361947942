//! On-disk cache of materialized resources
//!
//! Every resource identity owns one directory under the cache root. Entries
//! only become usable once their completion marker exists, and complete
//! entries are never modified in place.
//!
//! # Entry States
//!
//! | State | On disk | Meaning |
//! |-------|---------|---------|
//! | Absent | nothing | Never installed or removed |
//! | Partial | directory, no marker | Interrupted install, replaced on next attempt |
//! | Complete | directory + marker | Immutable, ready to use |

pub mod install;
pub mod lock;
pub mod store;

pub use install::Installer;
pub use lock::{CrossProcessLock, LockHandle};
pub use store::{format_bytes, CacheEntryInfo, CacheStore, EntryState, Marker, MARKER_FILE};
