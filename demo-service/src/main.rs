use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use demo_service::{build_router, AppState};
use jwt_chassis::{AuthConfig, AuthSettings};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = AuthSettings::from_env()?;
    let auth = Arc::new(AuthConfig::bootstrap(&settings).await);
    info!(issuer = auth.issuer(), algorithm = ?auth.algorithm(), has_key = auth.has_key(), "auth chassis ready");

    let app = build_router(AppState::new(auth));

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let ip: std::net::IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));
    info!(%addr, "starting demo-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
