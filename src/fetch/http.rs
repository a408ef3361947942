//! HTTP(S) transport built on ureq
//!
//! TLS certificate validation stays on (rustls with bundled roots).

use super::{url_file_name, FetchSettings, Fetched, Fetcher};
use crate::error::{GetpackError, GetpackResult};
use crate::resource::ResourceDescriptor;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};
use ureq::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use ureq::Agent;
use url::Url;

const USER_AGENT: &str = concat!("getpack/", env!("CARGO_PKG_VERSION"));

/// Streams `GET` responses to disk
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .timeout_connect(Some(settings.connect_timeout))
            .build();
        Self {
            agent: Agent::new_with_config(config),
        }
    }

    /// Download `url` to `destination`, returning the byte count
    pub fn download(&self, url: &str, destination: &Path) -> GetpackResult<u64> {
        info!("Downloading {}", url);

        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => GetpackError::FetchStatus {
                    url: url.to_string(),
                    status,
                },
                other => GetpackError::fetch(url, other),
            })?;

        // a decoded body no longer matches Content-Length
        let expected = if response.headers().contains_key(CONTENT_ENCODING) {
            None
        } else {
            response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
        };

        let file = File::create(destination)
            .map_err(|e| GetpackError::io(format!("creating {}", destination.display()), e))?;
        let mut writer = BufWriter::new(file);
        let mut reader = response.body_mut().as_reader();
        let received = io::copy(&mut reader, &mut writer).map_err(|e| GetpackError::fetch(url, e))?;
        writer
            .flush()
            .map_err(|e| GetpackError::io(format!("writing {}", destination.display()), e))?;

        if let Some(expected) = expected {
            if received != expected {
                return Err(GetpackError::FetchTruncated {
                    url: url.to_string(),
                    expected,
                    received,
                });
            }
        }

        debug!("Downloaded {} bytes from {}", received, url);
        Ok(received)
    }

    /// GET `url` and decode the body as JSON
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> GetpackResult<T> {
        debug!("Querying {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => GetpackError::FetchStatus {
                    url: url.to_string(),
                    status,
                },
                other => GetpackError::fetch(url, other),
            })?;
        let reader = response.body_mut().as_reader();
        Ok(serde_json::from_reader(reader)?)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(
        &self,
        source: &Url,
        _descriptor: &ResourceDescriptor,
        destination: &Path,
    ) -> GetpackResult<Fetched> {
        let bytes = self.download(source.as_str(), destination)?;
        Ok(Fetched {
            file_name: url_file_name(source).unwrap_or_else(|| "download".to_string()),
            bytes,
        })
    }
}
