pub mod app_state;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

pub use app_state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/me", get(handlers::whoami))
        .route(
            "/admin/public-key/refresh",
            post(handlers::refresh_public_key),
        )
        .with_state(state)
}
