//! Magic-link issuance and verification.
//!
//! A link carries an encrypted [`MagicLinkPayload`] in its `magic` query
//! parameter. Verification is a pure check of that payload against the
//! clock and the session nonce; consuming the nonce is the caller's job
//! (see `AuthService`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use thiserror::Error;

use crate::models::magic_link::MagicLinkPayload;
use crate::services::token_cipher::{CipherError, TokenCipher};

pub const MAGIC_LINK_PATH: &str = "/validate-magic-link";
pub const MAGIC_PARAM: &str = "magic";
pub const MAGIC_LINK_MAX_AGE_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MagicLinkError {
    #[error("magic search parameter is missing")]
    MissingToken,
    #[error("magic link is invalid")]
    MalformedToken,
    #[error("magic link has expired")]
    ExpiredToken,
    #[error("invalid nonce")]
    NonceMismatch,
}

impl MagicLinkError {
    pub fn code(&self) -> &'static str {
        match self {
            MagicLinkError::MissingToken => "missing_token",
            MagicLinkError::MalformedToken => "malformed_token",
            MagicLinkError::ExpiredToken => "expired_token",
            MagicLinkError::NonceMismatch => "nonce_mismatch",
        }
    }
}

impl IntoResponse for MagicLinkError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.to_string(), "code": self.code() })),
        )
            .into_response()
    }
}

#[derive(Debug, Clone)]
pub struct MagicLinkService {
    cipher: TokenCipher,
    origin: String,
    max_age: Duration,
}

impl MagicLinkService {
    pub fn new(cipher: TokenCipher, origin: &str) -> Self {
        Self {
            cipher,
            origin: origin.trim_end_matches('/').to_string(),
            max_age: Duration::minutes(MAGIC_LINK_MAX_AGE_MINUTES),
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn generate(&self, email: &str, nonce: &str) -> Result<String, CipherError> {
        self.generate_at(email, nonce, Utc::now())
    }

    /// `{origin}/validate-magic-link?magic={token}` for a payload issued at `now`.
    pub fn generate_at(
        &self,
        email: &str,
        nonce: &str,
        now: DateTime<Utc>,
    ) -> Result<String, CipherError> {
        let token = self.seal(&MagicLinkPayload::new(email, nonce, now))?;
        Ok(format!(
            "{}{}?{}={}",
            self.origin,
            MAGIC_LINK_PATH,
            MAGIC_PARAM,
            urlencoding::encode(&token)
        ))
    }

    pub fn seal(&self, payload: &MagicLinkPayload) -> Result<String, CipherError> {
        let json = serde_json::to_vec(payload).map_err(|_| CipherError::Encrypt)?;
        self.cipher.encrypt(&json)
    }

    /// Decrypts a token and checks it has the payload's shape.
    pub fn open(&self, token: &str) -> Result<MagicLinkPayload, MagicLinkError> {
        let plaintext = self.cipher.decrypt(token).map_err(|e| {
            tracing::debug!("Magic link failed to decrypt: {}", e);
            MagicLinkError::MalformedToken
        })?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            tracing::debug!("Magic link payload has the wrong shape: {}", e);
            MagicLinkError::MalformedToken
        })
    }

    pub fn verify(
        &self,
        magic: Option<&str>,
        session_nonce: Option<&str>,
    ) -> Result<MagicLinkPayload, MagicLinkError> {
        self.verify_at(magic, session_nonce, Utc::now())
    }

    /// Checks a link's token in order: presence, integrity, age, nonce.
    ///
    /// `magic` is the already percent-decoded query value.
    pub fn verify_at(
        &self,
        magic: Option<&str>,
        session_nonce: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MagicLinkPayload, MagicLinkError> {
        let token = magic
            .filter(|token| !token.is_empty())
            .ok_or(MagicLinkError::MissingToken)?;

        let payload = self.open(token)?;

        let expires_at = payload.created_at + self.max_age;
        if now > expires_at {
            return Err(MagicLinkError::ExpiredToken);
        }

        match session_nonce {
            Some(nonce) if nonce == payload.nonce => Ok(payload),
            _ => Err(MagicLinkError::NonceMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

    const ORIGIN: &str = "http://localhost:3000";

    fn service() -> MagicLinkService {
        MagicLinkService::new(TokenCipher::from_secret("test-magic-secret").unwrap(), ORIGIN)
    }

    fn token_of(url: &str) -> String {
        let encoded = url
            .split_once("?magic=")
            .map(|(_, token)| token)
            .unwrap();
        urlencoding::decode(encoded).unwrap().into_owned()
    }

    #[test]
    fn test_generated_url_shape() {
        let url = service().generate("alice@example.com", "n-1").unwrap();
        assert!(url.starts_with("http://localhost:3000/validate-magic-link?magic="));
        assert!(!token_of(&url).is_empty());
    }

    #[test]
    fn test_origin_trailing_slash_is_ignored() {
        let service =
            MagicLinkService::new(TokenCipher::from_secret("x").unwrap(), "https://pantry.test/");
        let url = service.generate("a@b.co", "n").unwrap();
        assert!(url.starts_with("https://pantry.test/validate-magic-link?magic="));
    }

    #[test]
    fn test_round_trip() {
        let service = service();
        let url = service.generate("alice@example.com", "nonce-1").unwrap();

        let payload = service
            .verify(Some(&token_of(&url)), Some("nonce-1"))
            .unwrap();
        assert_eq!(payload.email, "alice@example.com");
        assert_eq!(payload.nonce, "nonce-1");
    }

    #[test]
    fn test_missing_token() {
        let service = service();
        assert_eq!(
            service.verify(None, Some("nonce")),
            Err(MagicLinkError::MissingToken)
        );
        assert_eq!(
            service.verify(Some(""), Some("nonce")),
            Err(MagicLinkError::MissingToken)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let service = service();
        let issued = Utc::now();
        let token = token_of(&service.generate_at("a@b.co", "n", issued).unwrap());
        let max_age = service.max_age();

        let just_inside = issued + max_age - Duration::milliseconds(1);
        assert!(service.verify_at(Some(&token), Some("n"), just_inside).is_ok());

        let at_limit = issued + max_age;
        assert!(service.verify_at(Some(&token), Some("n"), at_limit).is_ok());

        let just_outside = issued + max_age + Duration::milliseconds(1);
        assert_eq!(
            service.verify_at(Some(&token), Some("n"), just_outside),
            Err(MagicLinkError::ExpiredToken)
        );
    }

    #[test]
    fn test_expiry_is_checked_before_nonce() {
        let service = service();
        let issued = Utc::now() - Duration::minutes(30);
        let token = token_of(&service.generate_at("a@b.co", "n", issued).unwrap());
        assert_eq!(
            service.verify(Some(&token), Some("other")),
            Err(MagicLinkError::ExpiredToken)
        );
    }

    #[test]
    fn test_nonce_must_match_exactly() {
        let service = service();
        let token = token_of(&service.generate("a@b.co", "nonce").unwrap());

        assert_eq!(
            service.verify(Some(&token), None),
            Err(MagicLinkError::NonceMismatch)
        );
        assert_eq!(
            service.verify(Some(&token), Some("NONCE")),
            Err(MagicLinkError::NonceMismatch)
        );
        assert_eq!(
            service.verify(Some(&token), Some("nonce ")),
            Err(MagicLinkError::NonceMismatch)
        );
    }

    #[test]
    fn test_every_bit_flip_is_malformed() {
        let service = service();
        let token = token_of(&service.generate("a@b.co", "n").unwrap());
        let bytes = BASE64.decode(&token).unwrap();

        for index in 0..bytes.len() {
            for bit in 0..8 {
                let mut tampered = bytes.clone();
                tampered[index] ^= 1 << bit;
                let tampered = BASE64.encode(&tampered);
                assert_eq!(
                    service.verify(Some(&tampered), Some("n")),
                    Err(MagicLinkError::MalformedToken),
                    "byte {} bit {}",
                    index,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_token_from_another_secret_is_malformed() {
        let other = MagicLinkService::new(TokenCipher::from_secret("other").unwrap(), ORIGIN);
        let token = token_of(&other.generate("a@b.co", "n").unwrap());
        assert_eq!(
            service().verify(Some(&token), Some("n")),
            Err(MagicLinkError::MalformedToken)
        );
    }

    #[test]
    fn test_wrong_payload_shape_is_malformed() {
        let cipher = TokenCipher::from_secret("test-magic-secret").unwrap();
        let service = service();
        for body in [
            r#"{"email":"a@b.co","nonce":"n"}"#,
            r#"{"email":1,"nonce":"n","createdAt":"2024-01-01T00:00:00Z"}"#,
            r#"{"email":"a@b.co","nonce":"n","createdAt":"yesterday"}"#,
            r#"[]"#,
            "not json",
        ] {
            let token = cipher.encrypt(body.as_bytes()).unwrap();
            assert_eq!(
                service.verify(Some(&token), Some("n")),
                Err(MagicLinkError::MalformedToken),
                "{}",
                body
            );
        }
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert_eq!(
            service().verify(Some("definitely not a token"), Some("n")),
            Err(MagicLinkError::MalformedToken)
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(MagicLinkError::MissingToken.code(), "missing_token");
        assert_eq!(MagicLinkError::NonceMismatch.to_string(), "invalid nonce");
        assert_eq!(
            MagicLinkError::ExpiredToken.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
