use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use jsonwebtoken::Algorithm;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AuthSettings;
use crate::key_source::{KeyOrigin, KeySource};
use crate::keys::KeyMaterial;

/// Per-call overrides for [`AuthConfig::refresh`]. Unset fields fall back to
/// the configured url and cache path; the explicit key has no fallback.
#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub explicit_key: Option<String>,
    pub key_url: Option<String>,
    pub key_file_path: Option<PathBuf>,
}

impl RefreshRequest {
    pub fn with_explicit_key(mut self, pem: impl Into<String>) -> Self {
        self.explicit_key = Some(pem.into());
        self
    }

    pub fn with_key_url(mut self, url: impl Into<String>) -> Self {
        self.key_url = Some(url.into());
        self
    }

    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file_path = Some(path.into());
        self
    }

    fn is_plain(&self) -> bool {
        self.explicit_key.is_none() && self.key_url.is_none() && self.key_file_path.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new key was swapped in.
    Updated(KeyOrigin),
    /// Nothing usable was resolved; the previous key stays active.
    Retained,
    /// Nothing usable was resolved and there is no previous key.
    Unavailable,
}

/// Issuer, algorithm and key locations fixed at startup, plus the active
/// verification key which only [`AuthConfig::refresh`] replaces.
pub struct AuthConfig {
    issuer: String,
    algorithm: Algorithm,
    key_url: Option<String>,
    key_file_path: PathBuf,
    key: RwLock<Option<Arc<KeyMaterial>>>,
    source: KeySource,
    // Outcome of the last plain refresh, for callers that queued behind it.
    refresh_lock: Mutex<Option<RefreshOutcome>>,
}

impl AuthConfig {
    /// Config with no key yet, using the HTTP fetcher and local cache file.
    pub fn new(settings: &AuthSettings) -> Self {
        Self::with_key_source(settings, KeySource::http(settings.fetch_timeout))
    }

    /// Config backed by a caller-built [`KeySource`]. The source keeps its own
    /// fetch timeout; `settings.fetch_timeout` only applies to [`AuthConfig::new`].
    pub fn with_key_source(settings: &AuthSettings, source: KeySource) -> Self {
        Self {
            issuer: settings.issuer.clone(),
            algorithm: settings.algorithm,
            key_url: settings.key_url.clone(),
            key_file_path: settings.key_file_path.clone(),
            key: RwLock::new(None),
            source,
            refresh_lock: Mutex::new(None),
        }
    }

    /// Build the config and resolve the first key, honouring the explicit
    /// key from `settings`.
    pub async fn bootstrap(settings: &AuthSettings) -> Self {
        let config = Self::new(settings);
        let request = RefreshRequest {
            explicit_key: settings.explicit_key.clone(),
            ..RefreshRequest::default()
        };
        if config.refresh(request).await == RefreshOutcome::Unavailable {
            warn!("starting without a verification key; requests will be rejected until a refresh succeeds");
        }
        config
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn key_url(&self) -> Option<&str> {
        self.key_url.as_deref()
    }

    pub fn key_file_path(&self) -> &Path {
        &self.key_file_path
    }

    pub fn key_source(&self) -> &KeySource {
        &self.source
    }

    /// Snapshot of the active key. The read lock is held only long enough to
    /// clone the `Arc`.
    pub fn current_key(&self) -> Option<Arc<KeyMaterial>> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_key(&self) -> bool {
        self.current_key().is_some()
    }

    /// Resolve a key (explicit, remote, cache file), persist remote keys to
    /// the cache file and swap the result in.
    ///
    /// Refreshes are serialized, and a plain request that arrives while
    /// another refresh is in flight takes that refresh's outcome instead of
    /// fetching again. A refresh dropped before it finishes publishes no
    /// outcome, so whoever queued behind it resolves a key itself. Material that does not parse for the configured
    /// algorithm counts as unresolved, so the previous key is kept.
    pub async fn refresh(&self, request: RefreshRequest) -> RefreshOutcome {
        let mut last = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                let guard = self.refresh_lock.lock().await;
                if let (true, Some(outcome)) = (request.is_plain(), *guard) {
                    debug!(?outcome, "joined in-flight key refresh");
                    return outcome;
                }
                guard
            }
        };

        // Cleared before resolving so a cancelled refresh leaves nothing to join.
        *last = None;
        let outcome = self.refresh_locked(&request).await;
        *last = request.is_plain().then_some(outcome);
        outcome
    }

    async fn refresh_locked(&self, request: &RefreshRequest) -> RefreshOutcome {
        let key_url = request.key_url.as_deref().or(self.key_url.as_deref());
        let key_file_path = request
            .key_file_path
            .as_deref()
            .unwrap_or(&self.key_file_path);

        let resolved = self
            .source
            .resolve(request.explicit_key.as_deref(), key_url, key_file_path)
            .await;

        let Some(resolved) = resolved else {
            return self.retain();
        };

        let origin = resolved.origin;
        let material = match KeyMaterial::from_pem(resolved.pem, self.algorithm) {
            Ok(material) => material,
            Err(err) => {
                warn!(?origin, error = %err, "resolved public key is unusable");
                return self.retain();
            }
        };

        // Cache-file keys are already on disk at this path.
        if origin == KeyOrigin::Remote {
            if let Err(err) = self.source.write_to_file(material.pem(), key_file_path) {
                warn!(error = %err, "could not persist fetched public key");
            }
        }

        self.swap(material);
        info!(?origin, "verification key updated");
        RefreshOutcome::Updated(origin)
    }

    fn swap(&self, material: KeyMaterial) {
        let next = Arc::new(material);
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = Some(next);
    }

    fn retain(&self) -> RefreshOutcome {
        if self.has_key() {
            warn!("key refresh failed, keeping the last known good key");
            RefreshOutcome::Retained
        } else {
            warn!("key refresh failed and no verification key is available");
            RefreshOutcome::Unavailable
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer", &self.issuer)
            .field("algorithm", &self.algorithm)
            .field("key_url", &self.key_url)
            .field("key_file_path", &self.key_file_path)
            .field("has_key", &self.has_key())
            .finish()
    }
}
