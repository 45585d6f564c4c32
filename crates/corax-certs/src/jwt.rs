//! PSK-signed JWT handling.
//!
//! The client and the core share a pre-shared key. Signing keys are
//! derived per token with PBKDF2-HMAC-SHA256 (100k rounds) over a
//! random 16-byte salt; the salt travels base64-encoded in the JWT
//! `kid` header so the receiver can derive the same key.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{CertsError, Result};

const PBKDF2_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;

/// Claims of the CA fingerprint proof sent by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintClaims {
    pub sha256_fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Minimal claims for client authentication tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub exp: u64,
}

/// Derive a 256-bit signing key from the PSK and a salt.
pub fn key_from_psk(psk: &str, salt: &[u8]) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(psk.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    key
}

/// Encode claims into a JWT signed with a PSK-derived key. The salt
/// rides in the standard `kid` header.
pub fn encode_jwt<T: Serialize>(claims: &T, psk: &str) -> Result<String> {
    let salt: [u8; SALT_LEN] = rand::random();
    let key = key_from_psk(psk, &salt);
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(BASE64.encode(salt));
    Ok(jsonwebtoken::encode(
        &header,
        claims,
        &EncodingKey::from_secret(&key),
    )?)
}

/// Decode and verify a JWT using the salt carried in its `kid` header.
pub fn decode_jwt<T: DeserializeOwned>(token: &str, psk: &str) -> Result<T> {
    let header = jsonwebtoken::decode_header(token)?;
    let salt = header
        .kid
        .as_deref()
        .and_then(|kid| BASE64.decode(kid).ok())
        .ok_or(CertsError::NoJwt)?;
    let key = key_from_psk(psk, &salt);

    let mut validation = Validation::new(Algorithm::HS256);
    // exp is optional on proofs; validated only when present
    validation.required_spec_claims.clear();

    let data = jsonwebtoken::decode::<T>(token, &DecodingKey::from_secret(&key), &validation)?;
    Ok(data.claims)
}

/// Decode a `Bearer <jwt>` authorization value.
pub fn decode_bearer<T: DeserializeOwned>(authorization: &str, psk: &str) -> Result<T> {
    let token = authorization
        .strip_prefix("Bearer ")
        .unwrap_or(authorization);
    decode_jwt(token, psk)
}

/// Build a `Bearer <jwt>` authorization value for client requests.
pub fn bearer_token(psk: &str, expire_in: Duration) -> Result<String> {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        + expire_in.as_secs();
    let token = encode_jwt(&AuthClaims { exp }, psk)?;
    Ok(format!("Bearer {token}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_derivation_depends_on_salt_and_psk() {
        let a = key_from_psk("secret", b"0123456789abcdef");
        let b = key_from_psk("secret", b"fedcba9876543210");
        let c = key_from_psk("other", b"0123456789abcdef");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, key_from_psk("secret", b"0123456789abcdef"));
    }

    #[test]
    fn test_jwt_round_trip() {
        let claims = FingerprintClaims {
            sha256_fingerprint: "AA:BB:CC".to_string(),
            exp: None,
        };
        let token = encode_jwt(&claims, "secret").unwrap();
        let decoded: FingerprintClaims = decode_jwt(&token, "secret").unwrap();
        assert_eq!(decoded.sha256_fingerprint, "AA:BB:CC");
    }

    #[test]
    fn test_wrong_psk_rejected() {
        let claims = FingerprintClaims {
            sha256_fingerprint: "AA".to_string(),
            exp: None,
        };
        let token = encode_jwt(&claims, "secret").unwrap();
        let err = decode_jwt::<FingerprintClaims>(&token, "not-the-psk").unwrap_err();
        assert!(matches!(err, CertsError::Jwt(_)));
    }

    #[test]
    fn test_bearer_round_trip() {
        let value = bearer_token("secret", Duration::from_secs(300)).unwrap();
        assert!(value.starts_with("Bearer "));
        let claims: AuthClaims = decode_bearer(&value, "secret").unwrap();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(claims.exp > now);
    }

    #[test]
    fn test_token_without_salt_is_not_a_proof() {
        // Signed directly with the PSK, no kid header: cannot be verified.
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &FingerprintClaims {
                sha256_fingerprint: "AA".to_string(),
                exp: None,
            },
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        let err = decode_jwt::<FingerprintClaims>(&token, "secret").unwrap_err();
        assert!(matches!(err, CertsError::NoJwt));
    }
}
