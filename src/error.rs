//! Error types for getpack
//!
//! All modules use `GetpackResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for getpack operations
pub type GetpackResult<T> = Result<T, GetpackError>;

/// Coarse error classification used for retry decisions and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed descriptor, unresolved template, bad config. Caller must fix input.
    Configuration,
    /// Network/transport failure, bad status, truncated or corrupt payload
    Fetch,
    /// Lock contention exceeded the configured timeout
    LockTimeout,
    /// Extraction or validation of fetched content failed
    Install,
    /// Cache root unwritable or lock primitive unavailable
    Environment,
    /// Running an executable from a resource failed
    Command,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Configuration => "configuration",
            Self::Fetch => "fetch",
            Self::LockTimeout => "lock-timeout",
            Self::Install => "install",
            Self::Environment => "environment",
            Self::Command => "command",
        };
        write!(f, "{}", name)
    }
}

/// All errors that can occur in getpack
#[derive(Error, Debug)]
pub enum GetpackError {
    // Configuration errors
    #[error("Invalid resource descriptor: {0}")]
    DescriptorInvalid(String),

    #[error("Unresolved placeholder {{{placeholder}}} in template '{template}'")]
    TemplateUnresolved { template: String, placeholder: String },

    #[error("Malformed template '{template}': {reason}")]
    TemplateMalformed { template: String, reason: String },

    #[error("Invalid source URL '{source_url}': {reason}")]
    SourceInvalid { source_url: String, reason: String },

    #[error("No fetcher registered for scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Unknown resource '{0}' (not in catalog)")]
    UnknownResource(String),

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Fetch errors
    #[error("Download failed: {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Unexpected status {status} for {url}")]
    FetchStatus { url: String, status: u16 },

    #[error("Truncated download from {url}: expected {expected} bytes, got {received}")]
    FetchTruncated {
        url: String,
        expected: u64,
        received: u64,
    },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("No matching release of {project} {version}: {reason}")]
    ReleaseNotFound {
        project: String,
        version: String,
        reason: String,
    },

    // Lock errors
    #[error("Timed out after {timeout:?} waiting for lock on {identity}")]
    LockTimeout { identity: String, timeout: Duration },

    #[error("Lock unavailable at {path}: {source}")]
    LockUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Install errors
    #[error("Failed to extract {archive}: {reason}")]
    Extract { archive: String, reason: String },

    #[error("Refusing unsafe archive entry '{entry}' in {archive}")]
    UnsafeEntry { archive: String, entry: String },

    #[error("Failed to install {identity}: {context}")]
    Install {
        identity: String,
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Environment errors
    #[error("Cache root {path} is not usable: {source}")]
    CacheRootUnusable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No cache directory could be determined. Set GETPACK_CACHE_DIR")]
    CacheRootUnknown,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command {command} exited with status {code}, stderr: {stderr}")]
    CommandExecution {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Program started by `getpack run` exited unsuccessfully
    #[error("Program exited with status {0}")]
    ChildExit(i32),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A memoized failure, returned again by a handle that already failed
    #[error(transparent)]
    Shared(Arc<GetpackError>),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GetpackError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an install error with context
    pub fn install(
        identity: impl Into<String>,
        context: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Install {
            identity: identity.into(),
            context: context.into(),
            source,
        }
    }

    /// Create a fetch failure
    pub fn fetch(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::FetchFailed {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DescriptorInvalid(_)
            | Self::TemplateUnresolved { .. }
            | Self::TemplateMalformed { .. }
            | Self::SourceInvalid { .. }
            | Self::UnsupportedScheme(_)
            | Self::UnknownResource(_)
            | Self::ConfigInvalid { .. }
            | Self::TomlParse(_)
            | Self::TomlSerialize(_) => ErrorKind::Configuration,

            Self::FetchFailed { .. }
            | Self::FetchStatus { .. }
            | Self::FetchTruncated { .. }
            | Self::ChecksumMismatch { .. }
            | Self::ReleaseNotFound { .. }
            | Self::Json(_) => ErrorKind::Fetch,

            Self::LockTimeout { .. } => ErrorKind::LockTimeout,

            Self::Extract { .. } | Self::UnsafeEntry { .. } | Self::Install { .. } => {
                ErrorKind::Install
            }

            Self::LockUnavailable { .. }
            | Self::CacheRootUnusable { .. }
            | Self::CacheRootUnknown
            | Self::ConfigDirCreate { .. }
            | Self::Prompt(_)
            | Self::Io { .. }
            | Self::Internal(_) => ErrorKind::Environment,

            Self::ExecutableNotFound(_)
            | Self::CommandFailed { .. }
            | Self::CommandExecution { .. }
            | Self::ChildExit(_) => ErrorKind::Command,

            Self::Shared(inner) => inner.kind(),
        }
    }

    /// Check if error is retryable with a fresh handle
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Fetch | ErrorKind::LockTimeout)
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Shared(inner) => inner.hint(),
            Self::CacheRootUnknown => Some("Set GETPACK_CACHE_DIR or pass --cache-dir"),
            Self::LockTimeout { .. } => {
                Some("Another process is installing this resource; retry later")
            }
            Self::UnknownResource(_) => Some("Run: getpack catalog"),
            Self::UnsupportedScheme(_) => Some("Supported schemes: http, https, file, pypi"),
            Self::CacheRootUnusable { .. } | Self::LockUnavailable { .. } => {
                Some("Check permissions of the cache directory")
            }
            _ => None,
        }
    }
}

impl From<Arc<GetpackError>> for GetpackError {
    fn from(shared: Arc<GetpackError>) -> Self {
        Self::Shared(shared)
    }
}
