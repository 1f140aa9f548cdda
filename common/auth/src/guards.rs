use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::auth_config::AuthConfig;
use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::roles::ROLE_ADMIN;
use crate::verifier::TokenValidator;

const BEARER_PREFIX: &str = "Bearer ";

/// Turns request headers into verified claims or a typed rejection.
pub trait Guard: Send + Sync {
    fn authorize(&self, headers: &HeaderMap) -> AuthResult<Claims>;
}

/// Extra condition evaluated on claims that already passed a guard.
pub trait ClaimsPredicate: Send + Sync {
    fn check(&self, claims: &Claims) -> AuthResult<()>;
}

impl<F> ClaimsPredicate for F
where
    F: Fn(&Claims) -> AuthResult<()> + Send + Sync,
{
    fn check(&self, claims: &Claims) -> AuthResult<()> {
        self(claims)
    }
}

/// Validates the bearer token against the current [`AuthConfig`].
#[derive(Clone)]
pub struct BearerGuard {
    config: Arc<AuthConfig>,
    validator: TokenValidator,
}

impl BearerGuard {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self::with_validator(config, TokenValidator::default())
    }

    pub fn with_validator(config: Arc<AuthConfig>, validator: TokenValidator) -> Self {
        Self { config, validator }
    }
}

impl Guard for BearerGuard {
    fn authorize(&self, headers: &HeaderMap) -> AuthResult<Claims> {
        let token = bearer_token(headers)?;
        let key = self.config.current_key().ok_or(AuthError::KeyUnavailable)?;
        self.validator.validate(
            token,
            &key,
            self.config.issuer(),
            &[self.config.algorithm()],
        )
    }
}

/// A guard followed by a predicate. The predicate only ever sees claims the
/// inner guard accepted.
#[derive(Clone)]
pub struct WithPredicate<G, P> {
    inner: G,
    predicate: P,
}

impl<G, P> WithPredicate<G, P> {
    pub fn new(inner: G, predicate: P) -> Self {
        Self { inner, predicate }
    }
}

impl<G: Guard, P: ClaimsPredicate> Guard for WithPredicate<G, P> {
    fn authorize(&self, headers: &HeaderMap) -> AuthResult<Claims> {
        let claims = self.inner.authorize(headers)?;
        self.predicate.check(&claims)?;
        Ok(claims)
    }
}

pub trait GuardExt: Guard + Sized {
    fn with_predicate<P: ClaimsPredicate>(self, predicate: P) -> WithPredicate<Self, P> {
        WithPredicate::new(self, predicate)
    }
}

impl<G: Guard> GuardExt for G {}

/// Requires `role` to equal the given value.
#[derive(Debug, Clone, Copy)]
pub struct RequireRole(pub &'static str);

impl ClaimsPredicate for RequireRole {
    fn check(&self, claims: &Claims) -> AuthResult<()> {
        if claims.has_role(self.0) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRole)
        }
    }
}

pub type AdminGuard = WithPredicate<BearerGuard, RequireRole>;

pub fn admin_guard(config: Arc<AuthConfig>) -> AdminGuard {
    BearerGuard::new(config).with_predicate(RequireRole(ROLE_ADMIN))
}

/// Token from an `Authorization: Bearer <token>` header. The scheme is matched
/// exactly, with one space, and the token may not carry any whitespace.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;
    let raw = value.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let token = raw
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MalformedHeader)?;

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}
