//! Named resource declarations
//!
//! A catalog maps names to declarations loaded from TOML. The built-in
//! catalog ships with the binary; user catalogs are merged on top of it.

use crate::error::{GetpackError, GetpackResult};
use crate::resource::descriptor::ATTR_EXECUTABLE;
use crate::resource::{ExtractRule, Overrides, ResourceDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

const BUILTIN: &str = include_str!("builtin.toml");

/// One declaration in a catalog file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    /// Display name; defaults to the table key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: String,
    pub version: String,
    pub source: String,
    /// Program inside the install, relative to its root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extract: Vec<ExtractRule>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// Name → declaration map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Declarations compiled into the binary
    pub fn builtin() -> GetpackResult<Self> {
        Self::from_toml_str(BUILTIN)
    }

    pub fn from_toml_str(content: &str) -> GetpackResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> GetpackResult<Self> {
        debug!("Loading catalog from {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| GetpackError::io(format!("reading catalog {}", path.display()), e))?;
        toml::from_str(&content).map_err(|e| GetpackError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Add the declarations of `other`, replacing entries with the same name
    pub fn merge(&mut self, other: Catalog) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the descriptor for `name`, applying `overrides` on top
    pub fn descriptor(
        &self,
        name: &str,
        overrides: &Overrides,
    ) -> GetpackResult<ResourceDescriptor> {
        let entry = self
            .get(name)
            .ok_or_else(|| GetpackError::UnknownResource(name.to_string()))?;
        let descriptor = entry.to_descriptor(name)?;
        if overrides.is_empty() {
            Ok(descriptor)
        } else {
            descriptor.with_overrides(overrides)
        }
    }
}

impl CatalogEntry {
    /// Descriptor for this entry declared under `key`
    pub fn to_descriptor(&self, key: &str) -> GetpackResult<ResourceDescriptor> {
        let mut descriptor = ResourceDescriptor::new(&self.kind, &self.version, &self.source)?
            .with_name(self.name.as_deref().unwrap_or(key))
            .with_extract_rules(self.extract.clone());
        for (k, v) in &self.extra {
            descriptor = descriptor.with_extra(k, v);
        }
        if let Some(executable) = &self.executable {
            descriptor = descriptor.with_extra(ATTR_EXECUTABLE, executable);
        }
        Ok(descriptor)
    }
}
