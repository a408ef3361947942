//! Cache identities derived from descriptors
//!
//! The identity is the only cache-directory name component. It combines a
//! readable slug with a SHA-256 prefix over kind, version and expanded source,
//! so same descriptor = same directory, and any change of version or source
//! lands somewhere else.

use super::descriptor::ResourceDescriptor;
use crate::error::GetpackResult;
use sha2::{Digest, Sha256};
use std::fmt;

/// Number of hash bytes kept in the identity (16 hex characters)
const HASH_BYTES: usize = 8;

/// Longest slug component kept before the hash
const MAX_SLUG_LEN: usize = 32;

/// Deterministic, filesystem-safe cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Derive the identity of `descriptor`. Pure: no I/O.
    pub fn derive(descriptor: &ResourceDescriptor) -> GetpackResult<Self> {
        let source = descriptor.source()?;

        let mut hasher = Sha256::new();
        hasher.update(descriptor.kind().as_bytes());
        hasher.update([0u8]);
        hasher.update(descriptor.version().as_bytes());
        hasher.update([0u8]);
        hasher.update(source.as_bytes());
        let digest = hasher.finalize();

        Ok(Self(format!(
            "{}-{}-{}",
            slug(descriptor.kind()),
            slug(descriptor.version()),
            hex::encode(&digest[..HASH_BYTES])
        )))
    }

    /// Wrap an identity read back from disk (e.g. a cache directory name)
    pub(crate) fn from_dir_name(name: &str) -> Option<Self> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && name.chars().all(is_safe_char);
        valid.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Reduce a free-form attribute to safe characters
fn slug(value: &str) -> String {
    let mut slug: String = value
        .chars()
        .map(|c| if is_safe_char(c) { c } else { '_' })
        .take(MAX_SLUG_LEN)
        .collect();
    // a leading dot would hide the entry and could collide with reserved dirs
    if slug.starts_with('.') {
        slug.replace_range(..1, "_");
    }
    slug
}
