//! `file://` transport: resolve an artifact that already exists locally

use super::{Fetched, Fetcher};
use crate::error::{GetpackError, GetpackResult};
use crate::resource::ResourceDescriptor;
use std::fs;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Copies a local file into the staging area
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl Fetcher for FileFetcher {
    fn fetch(
        &self,
        source: &Url,
        _descriptor: &ResourceDescriptor,
        destination: &Path,
    ) -> GetpackResult<Fetched> {
        let path = source
            .to_file_path()
            .map_err(|()| GetpackError::SourceInvalid {
                source_url: source.to_string(),
                reason: "not a local file path".to_string(),
            })?;

        if !path.is_file() {
            return Err(GetpackError::fetch(source.as_str(), "file does not exist"));
        }

        debug!("Copying {}", path.display());
        let bytes =
            fs::copy(&path, destination).map_err(|e| GetpackError::fetch(source.as_str(), e))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
            .to_string();
        Ok(Fetched { file_name, bytes })
    }
}
