pub mod auth_config;
pub mod claims;
pub mod clock;
pub mod config;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod key_source;
pub mod keys;
pub mod roles;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;
pub mod verifier;

pub use auth_config::{AuthConfig, RefreshOutcome, RefreshRequest};
pub use claims::Claims;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AuthSettings;
pub use error::{AuthError, AuthResult, ConfigError, KeySourceError};
pub use extractors::{AdminOnly, Authenticated};
pub use guards::{
    admin_guard, bearer_token, AdminGuard, BearerGuard, ClaimsPredicate, Guard, GuardExt,
    RequireRole, WithPredicate,
};
pub use key_source::{
    FsKeyFileStore, HttpKeyFetcher, KeyFetcher, KeyFileStore, KeyOrigin, KeySource, ResolvedKey,
};
pub use keys::KeyMaterial;
pub use roles::ROLE_ADMIN;
pub use verifier::{validate, validate_at, TokenValidator};

/// Algorithm identifiers, re-exported so callers need not depend on
/// `jsonwebtoken` directly.
pub use jsonwebtoken::Algorithm;
