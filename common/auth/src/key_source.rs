use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::DEFAULT_FETCH_TIMEOUT;
use crate::error::KeySourceError;

/// Retrieves key text from a remote location.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, KeySourceError>;
}

/// Full-content access to the key cache file.
pub trait KeyFileStore: Send + Sync {
    fn read(&self, path: &Path) -> Result<String, KeySourceError>;
    fn write(&self, path: &Path, key: &str) -> Result<(), KeySourceError>;
}

/// Plain GET over reqwest; anything but HTTP 200 is a failure.
#[derive(Clone)]
pub struct HttpKeyFetcher {
    client: Client,
}

impl HttpKeyFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "falling back to default HTTP client for key fetches");
                Client::new()
            });
        Self { client }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpKeyFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_FETCH_TIMEOUT)
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self, url: &str) -> Result<String, KeySourceError> {
        let response = self.client.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                KeySourceError::Timeout {
                    url: url.to_string(),
                }
            } else {
                KeySourceError::Transport {
                    url: url.to_string(),
                    reason: err.to_string(),
                }
            }
        })?;

        if response.status() != StatusCode::OK {
            return Err(KeySourceError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|err| KeySourceError::Transport {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

/// Local filesystem; writes go through a temporary file in the target
/// directory and are renamed into place.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsKeyFileStore;

impl KeyFileStore for FsKeyFileStore {
    fn read(&self, path: &Path) -> Result<String, KeySourceError> {
        fs::read_to_string(path).map_err(|source| io_error(path, source))
    }

    fn write(&self, path: &Path, key: &str) -> Result<(), KeySourceError> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|source| io_error(path, source))?;
        tmp.write_all(key.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|source| io_error(path, source))?;
        tmp.persist(path)
            .map_err(|err| io_error(path, err.error))?;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> KeySourceError {
    KeySourceError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Which tier produced a resolved key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    Explicit,
    Remote,
    CacheFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    pub pem: String,
    pub origin: KeyOrigin,
}

/// Ranked key lookup: explicit value, then remote fetch, then cache file.
///
/// Every tier failure is logged here and reported to callers as `None`.
#[derive(Clone)]
pub struct KeySource {
    fetcher: Arc<dyn KeyFetcher>,
    files: Arc<dyn KeyFileStore>,
    fetch_timeout: Duration,
}

impl KeySource {
    pub fn new(fetcher: Arc<dyn KeyFetcher>, files: Arc<dyn KeyFileStore>) -> Self {
        Self {
            fetcher,
            files,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// reqwest fetcher plus the local filesystem.
    pub fn http(fetch_timeout: Duration) -> Self {
        Self::new(
            Arc::new(HttpKeyFetcher::new(fetch_timeout)),
            Arc::new(FsKeyFileStore),
        )
        .with_fetch_timeout(fetch_timeout)
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    pub async fn resolve(
        &self,
        explicit_key: Option<&str>,
        key_url: Option<&str>,
        file_path: &Path,
    ) -> Option<ResolvedKey> {
        if let Some(pem) = explicit_key.filter(|value| !value.trim().is_empty()) {
            return Some(ResolvedKey {
                pem: pem.to_string(),
                origin: KeyOrigin::Explicit,
            });
        }

        if let Some(pem) = self.fetch_from_url(key_url.unwrap_or_default()).await {
            return Some(ResolvedKey {
                pem,
                origin: KeyOrigin::Remote,
            });
        }

        self.read_from_file(file_path).map(|pem| ResolvedKey {
            pem,
            origin: KeyOrigin::CacheFile,
        })
    }

    /// One bounded GET. Empty `url` short-circuits without touching the network.
    pub async fn fetch_from_url(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(pem) => {
                debug!(url, "fetched public key");
                Some(pem)
            }
            Err(KeySourceError::NoUrl) => None,
            Err(err) => {
                warn!(error = %err, "public key fetch failed, falling back to cache file");
                None
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<String, KeySourceError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(KeySourceError::NoUrl);
        }

        let body = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url))
            .await
            .map_err(|_| KeySourceError::Timeout {
                url: url.to_string(),
            })??;

        non_empty(body)
    }

    pub fn read_from_file(&self, path: &Path) -> Option<String> {
        match self.files.read(path).and_then(non_empty) {
            Ok(pem) => Some(pem),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not load public key from file");
                None
            }
        }
    }

    pub fn write_to_file(&self, key: &str, path: &Path) -> Result<(), KeySourceError> {
        self.files.write(path, key)
    }
}

fn non_empty(text: String) -> Result<String, KeySourceError> {
    if text.trim().is_empty() {
        Err(KeySourceError::Empty)
    } else {
        Ok(text)
    }
}
