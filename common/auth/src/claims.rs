use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::roles::ROLE_ADMIN;

/// Verified JWT payload. Only constructed by the validator, so every
/// instance has passed signature, issuer and expiry checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    #[serde(skip)]
    issuer: String,
    #[serde(skip)]
    expires_at: i64,
    #[serde(skip)]
    issued_at: Option<i64>,
    #[serde(flatten)]
    raw: Map<String, Value>,
}

impl Claims {
    pub(crate) fn new(
        issuer: String,
        expires_at: i64,
        issued_at: Option<i64>,
        raw: Map<String, Value>,
    ) -> Self {
        Self {
            issuer,
            expires_at,
            issued_at,
            raw,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// `exp` in seconds since the epoch.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// `iat` in seconds since the epoch, when the issuer set one.
    pub fn issued_at(&self) -> Option<i64> {
        self.issued_at
    }

    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }

    pub fn issued_at_utc(&self) -> Option<DateTime<Utc>> {
        self.issued_at
            .and_then(|iat| Utc.timestamp_opt(iat, 0).single())
    }

    pub fn role(&self) -> Option<&str> {
        self.raw.get("role").and_then(Value::as_str)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role() == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.raw.get(key)
    }

    /// The full claim set exactly as the issuer signed it.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.raw
    }
}
