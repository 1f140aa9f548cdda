use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::error::ConfigError;

pub const DEFAULT_ISSUER: &str = "mu-sse";
pub const DEFAULT_KEY_FILE: &str = "public_key.pem";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Startup settings for the chassis. Only the key itself changes after
/// startup, and that lives in [`crate::AuthConfig`].
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Expected issuer claim (iss).
    pub issuer: String,
    /// The single signing algorithm accepted for tokens.
    pub algorithm: Algorithm,
    /// Remote location of the PEM public key.
    pub key_url: Option<String>,
    /// Cache file the last fetched key is written to.
    pub key_file_path: PathBuf,
    /// Key supplied directly (e.g. injected by the deployment).
    pub explicit_key: Option<String>,
    /// Upper bound on a single remote key fetch.
    pub fetch_timeout: Duration,
}

impl AuthSettings {
    /// Settings with RS256, the default cache file and a 5 second fetch timeout.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            algorithm: Algorithm::RS256,
            key_url: None,
            key_file_path: PathBuf::from(DEFAULT_KEY_FILE),
            explicit_key: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_key_url(mut self, url: impl Into<String>) -> Self {
        self.key_url = normalize_optional(&url.into());
        self
    }

    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file_path = path.into();
        self
    }

    pub fn with_explicit_key(mut self, pem: impl Into<String>) -> Self {
        self.explicit_key = normalize_optional(&pem.into());
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Load settings from the process environment.
    ///
    /// `JWT_ISSUER`, `JWT_ALGORITHM`, `PUBLIC_KEY_URL`, `PUBLIC_KEY_FILE`,
    /// `PUBLIC_KEY` and `PUBLIC_KEY_FETCH_TIMEOUT_SECS` are all optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let issuer = lookup("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        if issuer.trim().is_empty() {
            return Err(ConfigError::EmptyIssuer);
        }

        let algorithm = match lookup("JWT_ALGORITHM") {
            Some(value) => parse_algorithm(&value)?,
            None => Algorithm::RS256,
        };

        let fetch_timeout = match lookup("PUBLIC_KEY_FETCH_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidValue {
                    key: "PUBLIC_KEY_FETCH_TIMEOUT_SECS",
                    value,
                })?,
            None => DEFAULT_FETCH_TIMEOUT,
        };

        let key_file_path = lookup("PUBLIC_KEY_FILE")
            .and_then(|value| normalize_optional(&value))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KEY_FILE));

        Ok(Self {
            issuer: issuer.trim().to_string(),
            algorithm,
            key_url: lookup("PUBLIC_KEY_URL").and_then(|value| normalize_optional(&value)),
            key_file_path,
            explicit_key: lookup("PUBLIC_KEY").and_then(|value| normalize_optional(&value)),
            fetch_timeout,
        })
    }
}

/// Parse an algorithm identifier, accepting only public-key families.
pub fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    let trimmed = value.trim();
    let algorithm = Algorithm::from_str(trimmed)
        .map_err(|_| ConfigError::UnsupportedAlgorithm(trimmed.to_string()))?;
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            Err(ConfigError::SymmetricAlgorithm(trimmed.to_string()))
        }
        other => Ok(other),
    }
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
