use std::fmt;

use jsonwebtoken::{Algorithm, DecodingKey};

use crate::error::KeySourceError;

/// A PEM public key together with the verification key parsed from it.
///
/// Instances are immutable; a refresh builds a new one and swaps it in.
#[derive(Clone)]
pub struct KeyMaterial {
    pem: String,
    algorithm: Algorithm,
    decoding: DecodingKey,
}

impl KeyMaterial {
    /// Parse `pem` for the key family `algorithm` belongs to.
    pub fn from_pem(pem: impl Into<String>, algorithm: Algorithm) -> Result<Self, KeySourceError> {
        let pem = pem.into();
        let invalid = |reason: String| KeySourceError::InvalidKey { algorithm, reason };
        let bytes = pem.as_bytes();
        let decoding = match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => DecodingKey::from_rsa_pem(bytes),
            Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(bytes),
            Algorithm::EdDSA => DecodingKey::from_ed_pem(bytes),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                return Err(invalid("symmetric algorithms are not supported".to_string()))
            }
        }
        .map_err(|err| invalid(err.to_string()))?;

        Ok(Self {
            pem,
            algorithm,
            decoding,
        })
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("pem_len", &self.pem.len())
            .finish()
    }
}
