//! Declarative resource descriptors
//!
//! A descriptor is a plain value: building one never touches the network or
//! the disk. Overrides produce a new descriptor and leave the original alone.

use super::template;
use crate::error::{GetpackError, GetpackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Extra attribute holding the archive format (`zip`, `tar`, `tar.gz`, `file`)
pub const ATTR_FORMAT: &str = "format";
/// Extra attribute holding the expected SHA-256 of the downloaded payload
pub const ATTR_SHA256: &str = "sha256";
/// Extra attribute holding the executable path relative to the install
pub const ATTR_EXECUTABLE: &str = "executable";
/// Extra attribute holding the platform tag used for release selection
pub const ATTR_PLATFORM: &str = "platform";

/// Maps archive entries under `prefix` to `path` inside the install
///
/// Both fields may contain placeholders. An empty prefix matches every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRule {
    /// Archive path prefix to match
    pub prefix: String,

    /// Destination directory, relative to the install root
    #[serde(default)]
    pub path: String,
}

impl ExtractRule {
    pub fn new(prefix: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            path: path.into(),
        }
    }
}

impl Default for ExtractRule {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// Immutable description of an external resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    name: String,
    kind: String,
    version: String,
    source: String,
    extra: BTreeMap<String, String>,
    extract: Vec<ExtractRule>,
}

/// Replacement values applied by [`ResourceDescriptor::with_overrides`]
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub version: Option<String>,
    pub source: Option<String>,
    pub extra: BTreeMap<String, String>,
    pub extract: Option<Vec<ExtractRule>>,
}

impl Overrides {
    /// Override only the version
    pub fn version(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.version.is_none()
            && self.source.is_none()
            && self.extra.is_empty()
            && self.extract.is_none()
    }
}

impl ResourceDescriptor {
    /// Create a descriptor. `kind`, `version` and `source` must be non-empty.
    ///
    /// The name defaults to the kind until [`with_name`](Self::with_name) is used.
    pub fn new(
        kind: impl Into<String>,
        version: impl Into<String>,
        source: impl Into<String>,
    ) -> GetpackResult<Self> {
        let kind = kind.into();
        let descriptor = Self {
            name: kind.clone(),
            kind,
            version: version.into(),
            source: source.into(),
            extra: BTreeMap::new(),
            extract: vec![ExtractRule::default()],
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Replace the extraction rules. An empty list restores the default rule.
    pub fn with_extract_rules(mut self, rules: Vec<ExtractRule>) -> Self {
        self.extract = if rules.is_empty() {
            vec![ExtractRule::default()]
        } else {
            rules
        };
        self
    }

    /// Produce a derived descriptor with `overrides` applied
    pub fn with_overrides(&self, overrides: &Overrides) -> GetpackResult<Self> {
        let mut derived = self.clone();
        if let Some(name) = &overrides.name {
            derived.name = name.clone();
        }
        if let Some(kind) = &overrides.kind {
            derived.kind = kind.clone();
        }
        if let Some(version) = &overrides.version {
            derived.version = version.clone();
        }
        if let Some(source) = &overrides.source {
            derived.source = source.clone();
        }
        for (key, value) in &overrides.extra {
            derived.extra.insert(key.clone(), value.clone());
        }
        if let Some(rules) = &overrides.extract {
            derived = derived.with_extract_rules(rules.clone());
        }
        derived.validate()?;
        Ok(derived)
    }

    fn validate(&self) -> GetpackResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("kind", &self.kind),
            ("version", &self.version),
            ("source", &self.source),
        ] {
            if value.trim().is_empty() {
                return Err(GetpackError::DescriptorInvalid(format!(
                    "'{}' must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The source as declared, placeholders unexpanded
    pub fn source_template(&self) -> &str {
        &self.source
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }

    pub fn extras(&self) -> &BTreeMap<String, String> {
        &self.extra
    }

    pub fn extract_rules(&self) -> &[ExtractRule] {
        &self.extract
    }

    /// Value of a template placeholder
    fn placeholder(&self, key: &str) -> Option<&str> {
        match key {
            "name" => Some(&self.name),
            "kind" => Some(&self.kind),
            "version" => Some(&self.version),
            other => self.extra(other),
        }
    }

    /// Expand placeholders in any string using this descriptor's attributes
    pub fn expand(&self, template: &str) -> GetpackResult<String> {
        template::expand(template, |key| self.placeholder(key))
    }

    /// The source with all placeholders expanded
    pub fn source(&self) -> GetpackResult<String> {
        self.expand(&self.source)
    }

    /// The expanded source parsed as a URL
    pub fn source_url(&self) -> GetpackResult<Url> {
        let source = self.source()?;
        Url::parse(&source).map_err(|e| GetpackError::SourceInvalid {
            source_url: source.clone(),
            reason: e.to_string(),
        })
    }

    /// Extraction rules with placeholders expanded
    pub fn expanded_rules(&self) -> GetpackResult<Vec<ExtractRule>> {
        self.extract
            .iter()
            .map(|rule| {
                Ok(ExtractRule {
                    prefix: self.expand(&rule.prefix)?,
                    path: self.expand(&rule.path)?,
                })
            })
            .collect()
    }
}
