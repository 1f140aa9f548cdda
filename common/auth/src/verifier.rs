use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, Validation};
use serde_json::{Map, Value};
use tracing::debug;

use crate::claims::Claims;
use crate::clock::{Clock, SystemClock};
use crate::error::{AuthError, AuthResult};
use crate::keys::KeyMaterial;

/// Verify `token` against `key`, accepting only `algorithms`, and check
/// issuer and expiry against the system clock.
pub fn validate(
    token: &str,
    key: &KeyMaterial,
    issuer: &str,
    algorithms: &[Algorithm],
) -> AuthResult<Claims> {
    validate_at(token, key, issuer, algorithms, SystemClock.now())
}

/// Same as [`validate`] with an explicit "now" in epoch seconds.
///
/// Checks run in a fixed order: signature, then issuer, then expiry. There is
/// no clock-skew leeway; a token is valid only while `exp > now`.
pub fn validate_at(
    token: &str,
    key: &KeyMaterial,
    issuer: &str,
    algorithms: &[Algorithm],
    now: i64,
) -> AuthResult<Claims> {
    let first = algorithms
        .first()
        .copied()
        .ok_or_else(|| AuthError::InvalidSignature("empty algorithm allowlist".to_string()))?;

    // Signature and structure only; claim checks below keep their own order
    // and error kinds.
    let mut validation = Validation::new(first);
    validation.algorithms = algorithms.to_vec();
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let token_data = decode::<Map<String, Value>>(token, key.decoding_key(), &validation)?;
    let raw = token_data.claims;

    let token_issuer = raw
        .get("iss")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::WrongIssuer(String::new()))?;
    if token_issuer != issuer {
        return Err(AuthError::WrongIssuer(token_issuer.to_string()));
    }

    let expires_at = raw
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(AuthError::ExpiredToken)?;
    if expires_at <= now {
        return Err(AuthError::ExpiredToken);
    }

    let issued_at = match raw.get("iat") {
        None => None,
        Some(value) => Some(
            value
                .as_i64()
                .ok_or_else(|| AuthError::InvalidSignature("iat is not an integer".to_string()))?,
        ),
    };

    debug!(alg = ?token_data.header.alg, exp = expires_at, "verified JWT successfully");
    Ok(Claims::new(
        token_issuer.to_string(),
        expires_at,
        issued_at,
        raw,
    ))
}

/// Validator bound to a clock, shared by the guards.
#[derive(Clone)]
pub struct TokenValidator {
    clock: Arc<dyn Clock>,
}

impl TokenValidator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn validate(
        &self,
        token: &str,
        key: &KeyMaterial,
        issuer: &str,
        algorithms: &[Algorithm],
    ) -> AuthResult<Claims> {
        validate_at(token, key, issuer, algorithms, self.clock.now())
    }
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{current_timestamp, FixedClock};
    use crate::test_support::{
        encode_mock_jwt, encode_with_key, mock_claims, ALTERNATE_PRIVATE_KEY, TESTING_PUBLIC_KEY,
    };
    use serde_json::json;

    const RS256: &[Algorithm] = &[Algorithm::RS256];

    fn testing_key() -> KeyMaterial {
        KeyMaterial::from_pem(TESTING_PUBLIC_KEY, Algorithm::RS256).expect("testing key")
    }

    fn claims_with(iss: &str, exp: i64, iat: i64) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("iss".into(), json!(iss));
        claims.insert("exp".into(), json!(exp));
        claims.insert("iat".into(), json!(iat));
        claims
    }

    #[test]
    fn accepts_matching_token_and_returns_claims_unmodified() {
        let now = current_timestamp();
        let expected = claims_with("mu-sse", now + 60, now);
        let token = encode_mock_jwt(&expected);

        let claims = validate(&token, &testing_key(), "mu-sse", RS256).expect("valid token");

        assert_eq!(claims.issuer(), "mu-sse");
        assert_eq!(claims.expires_at(), now + 60);
        assert_eq!(claims.issued_at(), Some(now));
        assert_eq!(claims.as_map(), &expected);
    }

    #[test]
    fn mock_claim_set_round_trips_every_field() {
        let expected = mock_claims();
        let token = encode_mock_jwt(&expected);
        let claims = validate(&token, &testing_key(), "mu-sse", RS256).expect("valid token");
        for (key, value) in &expected {
            assert_eq!(claims.get(key), Some(value), "claim {key}");
        }
    }

    #[test]
    fn expired_one_second_ago_is_rejected() {
        let now = 1_700_000_000;
        let token = encode_mock_jwt(&claims_with("mu-sse", now - 1, now - 301));
        let err = validate_at(&token, &testing_key(), "mu-sse", RS256, now).expect_err("expired");
        assert_eq!(err, AuthError::ExpiredToken);
    }

    #[test]
    fn expiry_equal_to_now_is_rejected() {
        let now = 1_700_000_000;
        let token = encode_mock_jwt(&claims_with("mu-sse", now, now - 60));
        let err = validate_at(&token, &testing_key(), "mu-sse", RS256, now).expect_err("expired");
        assert_eq!(err, AuthError::ExpiredToken);
    }

    #[test]
    fn missing_expiry_is_rejected() {
        let mut claims = claims_with("mu-sse", 0, 1_700_000_000);
        claims.remove("exp");
        let token = encode_mock_jwt(&claims);
        let err = validate_at(&token, &testing_key(), "mu-sse", RS256, 1_700_000_000)
            .expect_err("no exp");
        assert_eq!(err, AuthError::ExpiredToken);
    }

    #[test]
    fn issuer_mismatch_is_rejected_even_when_otherwise_valid() {
        let now = 1_700_000_000;
        let token = encode_mock_jwt(&claims_with("someone-else", now + 60, now));
        let err = validate_at(&token, &testing_key(), "mu-sse", RS256, now).expect_err("issuer");
        assert_eq!(err, AuthError::WrongIssuer("someone-else".into()));
    }

    #[test]
    fn issuer_is_checked_before_expiry() {
        let now = 1_700_000_000;
        let token = encode_mock_jwt(&claims_with("someone-else", now - 10, now - 70));
        let err = validate_at(&token, &testing_key(), "mu-sse", RS256, now).expect_err("issuer");
        assert!(matches!(err, AuthError::WrongIssuer(_)));
    }

    #[test]
    fn signature_from_another_key_is_rejected() {
        let now = 1_700_000_000;
        let token = encode_with_key(&claims_with("mu-sse", now + 60, now), ALTERNATE_PRIVATE_KEY);
        let err = validate_at(&token, &testing_key(), "mu-sse", RS256, now).expect_err("forged");
        assert!(matches!(err, AuthError::InvalidSignature(_)));
    }

    #[test]
    fn algorithm_outside_allowlist_is_rejected() {
        let now = 1_700_000_000;
        let token = encode_mock_jwt(&claims_with("mu-sse", now + 60, now));
        let err = validate_at(&token, &testing_key(), "mu-sse", &[Algorithm::RS512], now)
            .expect_err("alg");
        assert!(matches!(err, AuthError::InvalidSignature(_)));
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.\
                     eyJpc3MiOiJtdS1zc2UiLCJleHAiOjQxMDI0NDQ4MDAsImlhdCI6MTcwMDAwMDAwMCwicm9sZSI6ImFkbWluIn0.";
        let err = validate(token, &testing_key(), "mu-sse", RS256).expect_err("alg none");
        assert!(matches!(err, AuthError::InvalidSignature(_)));
    }

    #[test]
    fn garbage_and_empty_allowlist_are_rejected() {
        let err = validate("not-a-token", &testing_key(), "mu-sse", RS256).expect_err("garbage");
        assert!(matches!(err, AuthError::InvalidSignature(_)));

        let token = encode_mock_jwt(&mock_claims());
        let err = validate(&token, &testing_key(), "mu-sse", &[]).expect_err("allowlist");
        assert!(matches!(err, AuthError::InvalidSignature(_)));
    }

    #[test]
    fn missing_iat_is_tolerated() {
        let now = 1_700_000_000;
        let mut claims = claims_with("mu-sse", now + 60, now);
        claims.remove("iat");
        let token = encode_mock_jwt(&claims);
        let verified = validate_at(&token, &testing_key(), "mu-sse", RS256, now).expect("valid");
        assert_eq!(verified.issued_at(), None);
    }

    #[test]
    fn validator_uses_its_clock() {
        let now = 1_700_000_000;
        let token = encode_mock_jwt(&claims_with("mu-sse", now + 60, now));
        let key = testing_key();

        let before = TokenValidator::new(Arc::new(FixedClock(now)));
        assert!(before.validate(&token, &key, "mu-sse", RS256).is_ok());

        let after = TokenValidator::new(Arc::new(FixedClock(now + 60)));
        assert_eq!(
            after.validate(&token, &key, "mu-sse", RS256),
            Err(AuthError::ExpiredToken)
        );
    }
}
