use std::time::Duration;

use httpmock::prelude::*;
use jwt_chassis::clock::current_timestamp;
use jwt_chassis::test_support::{encode_mock_jwt, TESTING_PUBLIC_KEY};
use jwt_chassis::{
    validate, Algorithm, AuthConfig, AuthError, AuthSettings, BearerGuard, Guard, KeyMaterial,
    KeyOrigin, RefreshOutcome, RefreshRequest,
};
use serde_json::{json, Map, Value};

fn token_claims(iss: &str, exp: i64, iat: i64) -> Map<String, Value> {
    match json!({ "iss": iss, "exp": exp, "iat": iat }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[test]
fn issued_token_validates_against_matching_public_key() {
    let now = current_timestamp();
    let token = encode_mock_jwt(&token_claims("mu-sse", now + 60, now));
    let key = KeyMaterial::from_pem(TESTING_PUBLIC_KEY, Algorithm::RS256).expect("key");

    let claims = validate(&token, &key, "mu-sse", &[Algorithm::RS256]).expect("valid");

    assert_eq!(claims.issuer(), "mu-sse");
    assert_eq!(claims.expires_at(), now + 60);
    assert_eq!(claims.get("iss"), Some(&json!("mu-sse")));
    assert_eq!(claims.get("exp"), Some(&json!(now + 60)));
}

#[tokio::test]
async fn bootstrap_fetches_caches_and_survives_an_outage() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = dir.path().join("public_key.pem");
    let server = MockServer::start();
    let mut key_mock = server.mock(|when, then| {
        when.method(GET).path("/pk");
        then.status(200).body(TESTING_PUBLIC_KEY);
    });

    let settings = AuthSettings::new("mu-sse")
        .with_key_url(server.url("/pk"))
        .with_key_file(&cache)
        .with_fetch_timeout(Duration::from_secs(2));
    let config = std::sync::Arc::new(AuthConfig::bootstrap(&settings).await);

    key_mock.assert_hits(1);
    assert!(config.has_key());
    assert_eq!(std::fs::read_to_string(&cache).expect("cache"), TESTING_PUBLIC_KEY);

    // Identity provider goes away: the cache file takes over.
    key_mock.delete();
    let _down = server.mock(|when, then| {
        when.method(GET).path("/pk");
        then.status(503);
    });
    assert_eq!(
        config.refresh(RefreshRequest::default()).await,
        RefreshOutcome::Updated(KeyOrigin::CacheFile)
    );

    // Cache file gone as well: the last good key stays active.
    std::fs::remove_file(&cache).expect("remove cache");
    assert_eq!(
        config.refresh(RefreshRequest::default()).await,
        RefreshOutcome::Retained
    );

    let now = current_timestamp();
    let token = encode_mock_jwt(&token_claims("mu-sse", now + 60, now));
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        format!("Bearer {token}").parse().expect("header"),
    );
    let claims = BearerGuard::new(config).authorize(&headers).expect("still serving");
    assert_eq!(claims.issuer(), "mu-sse");
}

#[tokio::test]
async fn never_resolved_key_rejects_every_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let settings = AuthSettings::new("mu-sse").with_key_file(dir.path().join("missing.pem"));
    let config = std::sync::Arc::new(AuthConfig::bootstrap(&settings).await);
    assert!(!config.has_key());

    let now = current_timestamp();
    let token = encode_mock_jwt(&token_claims("mu-sse", now + 60, now));
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        axum::http::header::AUTHORIZATION,
        format!("Bearer {token}").parse().expect("header"),
    );
    assert_eq!(
        BearerGuard::new(config).authorize(&headers),
        Err(AuthError::KeyUnavailable)
    );
}

#[tokio::test]
async fn explicit_key_from_settings_wins_over_remote() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = MockServer::start();
    let key_mock = server.mock(|when, then| {
        when.method(GET).path("/pk");
        then.status(200).body("unused");
    });

    let settings = AuthSettings::new("mu-sse")
        .with_key_url(server.url("/pk"))
        .with_key_file(dir.path().join("public_key.pem"))
        .with_explicit_key(TESTING_PUBLIC_KEY);
    let config = AuthConfig::bootstrap(&settings).await;

    key_mock.assert_hits(0);
    assert!(config.has_key());
    assert!(!dir.path().join("public_key.pem").exists());
}
