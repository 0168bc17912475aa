//! HMAC-SHA256 access tokens and refresh-secret minting.
//!
//! Access tokens are compact JWS (HS256): base64url(header).base64url(claims)
//! signed with a shared key. Verification checks the signature in constant
//! time before it looks at expiry, so a forged token never reaches the
//! claims parser's error path.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use planeja_core::auth::service::TokenService;
use planeja_types::error::AuthError;
use planeja_types::identity::{AccessClaims, Subject};
use serde::Serialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const REFRESH_SECRET_BYTES: usize = 48;

#[derive(Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

pub struct HmacTokenSigner {
    key: Vec<u8>,
    access_ttl: Duration,
}

impl HmacTokenSigner {
    pub fn new(secret: &str, access_ttl_minutes: i64) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            access_ttl: Duration::minutes(access_ttl_minutes),
        }
    }

    fn mac(&self) -> Result<HmacSha256, AuthError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| AuthError::Token(e.to_string()))
    }
}

fn encode_json<T: Serialize>(value: &T) -> Result<String, AuthError> {
    let json = serde_json::to_vec(value).map_err(|e| AuthError::Token(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

impl TokenService for HmacTokenSigner {
    fn sign_access(&self, subject: &Subject) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: subject.id,
            name: subject.name.clone(),
            email: subject.email.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        let header = encode_json(&Header {
            alg: "HS256",
            typ: "JWT",
        })?;
        let payload = encode_json(&claims)?;
        let signing_input = format!("{header}.{payload}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut parts = token.split('.');
        let (header, payload, signature) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(AuthError::Token("malformed token".to_string())),
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| AuthError::Token("malformed signature".to_string()))?;
        let mut mac = self.mac()?;
        mac.update(format!("{header}.{payload}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::Token("signature mismatch".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| AuthError::Token("malformed payload".to_string()))?;
        let claims: AccessClaims = serde_json::from_slice(&payload)
            .map_err(|_| AuthError::Token("malformed claims".to_string()))?;

        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Token("access token expired".to_string()));
        }

        Ok(claims)
    }

    fn new_refresh_secret(&self) -> String {
        let mut bytes = [0u8; REFRESH_SECRET_BYTES];
        OsRng.fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn subject() -> Subject {
        Subject {
            id: Uuid::now_v7(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    fn signer() -> HmacTokenSigner {
        HmacTokenSigner::new("test-secret", 15)
    }

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let signer = signer();
        let s = subject();
        let token = signer.sign_access(&s).unwrap();

        let claims = signer.verify_access(&token).unwrap();
        assert_eq!(claims.sub, s.id);
        assert_eq!(claims.email, "ana@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_tampered_payload_is_rejected() {
        let signer = signer();
        let token = signer.sign_access(&subject()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let tampered_payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"0","name":"x","email":"x","iat":0,"exp":9999999999}"#);
        parts[1] = &tampered_payload;
        let tampered = parts.join(".");

        let err = signer.verify_access(&tampered).unwrap_err();
        assert!(matches!(err, AuthError::Token(_)));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let token = signer().sign_access(&subject()).unwrap();
        let other = HmacTokenSigner::new("different-secret", 15);
        assert!(other.verify_access(&token).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = HmacTokenSigner::new("test-secret", -1);
        let token = signer.sign_access(&subject()).unwrap();
        let err = signer.verify_access(&token).unwrap_err();
        assert!(matches!(err, AuthError::Token(msg) if msg.contains("expired")));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        let signer = signer();
        for garbage in ["", "a", "a.b", "a.b.c.d", "not base64 at all . x . y"] {
            assert!(signer.verify_access(garbage).is_err(), "accepted {garbage:?}");
        }
    }

    #[test]
    fn test_refresh_secrets_are_long_and_unique() {
        let signer = signer();
        let a = signer.new_refresh_secret();
        let b = signer.new_refresh_secret();

        assert_eq!(a.len(), REFRESH_SECRET_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
