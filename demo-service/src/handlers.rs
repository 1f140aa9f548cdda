use axum::extract::State;
use axum::Json;
use jwt_chassis::{AdminOnly, Authenticated, KeyOrigin, RefreshOutcome, RefreshRequest};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::app_state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn whoami(Authenticated(claims): Authenticated) -> Json<Value> {
    Json(Value::Object(claims.into_map()))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<&'static str>,
}

impl From<RefreshOutcome> for RefreshResponse {
    fn from(value: RefreshOutcome) -> Self {
        match value {
            RefreshOutcome::Updated(origin) => Self {
                outcome: "updated",
                origin: Some(match origin {
                    KeyOrigin::Explicit => "explicit",
                    KeyOrigin::Remote => "remote",
                    KeyOrigin::CacheFile => "cache_file",
                }),
            },
            RefreshOutcome::Retained => Self {
                outcome: "retained",
                origin: None,
            },
            RefreshOutcome::Unavailable => Self {
                outcome: "unavailable",
                origin: None,
            },
        }
    }
}

/// Operator-triggered key refresh from the configured url and cache file.
pub async fn refresh_public_key(
    State(state): State<AppState>,
    AdminOnly(claims): AdminOnly,
) -> Json<RefreshResponse> {
    info!(sub = ?claims.get("sub"), "public key refresh requested");
    let outcome = state.auth.refresh(RefreshRequest::default()).await;
    Json(outcome.into())
}
