use std::sync::Arc;

use axum::extract::FromRef;
use jwt_chassis::AuthConfig;

/// Shared application state used by handlers.
#[derive(Clone)]
pub struct AppState {
    pub(crate) auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(auth: Arc<AuthConfig>) -> Self {
        Self { auth }
    }
}

impl FromRef<AppState> for Arc<AuthConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}
