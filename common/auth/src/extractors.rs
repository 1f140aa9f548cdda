use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::auth_config::AuthConfig;
use crate::claims::Claims;
use crate::error::AuthError;
use crate::guards::{admin_guard, BearerGuard, Guard};

/// Claims of any caller holding a valid bearer token.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Claims);

/// Claims of a caller whose token carries `role = "admin"`.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub Claims);

impl Authenticated {
    pub fn into_claims(self) -> Claims {
        self.0
    }
}

impl AdminOnly {
    pub fn into_claims(self) -> Claims {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    Arc<AuthConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<AuthConfig>::from_ref(state);
        BearerGuard::new(config)
            .authorize(&parts.headers)
            .map(Self)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminOnly
where
    Arc<AuthConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<AuthConfig>::from_ref(state);
        admin_guard(config).authorize(&parts.headers).map(Self)
    }
}
