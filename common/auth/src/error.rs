use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

pub const ADMIN_ONLY_MESSAGE: &str = "Only admins can perform this action";

/// Request-path failures. The `Display` text carries diagnostic detail for
/// logs; responses only ever expose [`AuthError::message`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingCredentials,
    #[error("authorization header malformed")]
    MalformedHeader,
    #[error("token verification failed: {0}")]
    InvalidSignature(String),
    #[error("token expired")]
    ExpiredToken,
    #[error("token issuer '{0}' is not trusted")]
    WrongIssuer(String),
    #[error("only admins can perform this action")]
    InsufficientRole,
    #[error("no verification key available")]
    KeyUnavailable,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials
            | AuthError::MalformedHeader
            | AuthError::InvalidSignature(_)
            | AuthError::ExpiredToken
            | AuthError::WrongIssuer(_) => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientRole => StatusCode::FORBIDDEN,
            AuthError::KeyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "AUTH_MISSING",
            AuthError::MalformedHeader => "AUTH_HEADER",
            AuthError::InvalidSignature(_) => "AUTH_TOKEN",
            AuthError::ExpiredToken => "AUTH_EXPIRED",
            AuthError::WrongIssuer(_) => "AUTH_ISSUER",
            AuthError::InsufficientRole => "AUTH_ROLE",
            AuthError::KeyUnavailable => "AUTH_KEY",
        }
    }

    /// Fixed, non-sensitive message returned to callers.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "Missing credentials",
            AuthError::MalformedHeader => "Invalid authorization header",
            AuthError::InvalidSignature(_) => "Could not decode JWT",
            AuthError::ExpiredToken => "Token has expired",
            AuthError::WrongIssuer(_) => "Invalid token issuer",
            AuthError::InsufficientRole => ADMIN_ONLY_MESSAGE,
            AuthError::KeyUnavailable => "Authentication is temporarily unavailable",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Self::InvalidSignature(value.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code(),
            message: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Outcome of a single key-source tier. These never cross the key-source
/// boundary; they are logged and turned into an absent key.
#[derive(Debug, Error)]
pub enum KeySourceError {
    #[error("no key url configured")]
    NoUrl,
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("key source returned an empty body")]
    Empty,
    #[error("key is not a valid {algorithm:?} public key: {reason}")]
    InvalidKey {
        algorithm: jsonwebtoken::Algorithm,
        reason: String,
    },
    #[error("key file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("symmetric algorithm '{0}' cannot be used with a public key")]
    SymmetricAlgorithm(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("issuer must not be empty")]
    EmptyIssuer,
}
