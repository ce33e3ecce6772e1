use axum_extra::extract::cookie::{Key, SameSite};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha512};
use time::Duration;

use super::ConfigError;

pub const SESSION_COOKIE_NAME: &str = "pantry__session";
pub const THEME_COOKIE_NAME: &str = "pantry__theme";

/// Attributes of the session cookie.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub max_age: Duration,
    pub name: String,
}

impl SessionConfig {
    pub fn for_environment(environment: &str) -> Self {
        if environment == "production" {
            SessionConfig {
                secure: true,
                http_only: true,
                // Lax so the session survives the top-level navigation from
                // the email client to the magic link.
                same_site: SameSite::Lax,
                max_age: Duration::days(30),
                name: format!("__Host-{}", SESSION_COOKIE_NAME),
            }
        } else {
            SessionConfig {
                secure: false,
                http_only: true,
                same_site: SameSite::Lax,
                max_age: Duration::days(30),
                name: SESSION_COOKIE_NAME.to_string(),
            }
        }
    }
}

/// Cookie signing keys, newest first.
///
/// The newest key signs every cookie we write; any key verifies, so an old
/// secret can stay listed until the cookies it signed have expired.
#[derive(Clone)]
pub struct SessionKeys {
    keys: Vec<Key>,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("keys", &format!("[{} REDACTED]", self.keys.len()))
            .finish()
    }
}

impl SessionKeys {
    pub fn from_secrets<S: AsRef<str>>(secrets: &[S]) -> Result<Self, ConfigError> {
        let keys: Vec<Key> = secrets
            .iter()
            .map(|secret| secret.as_ref().trim())
            .filter(|secret| !secret.is_empty())
            .map(|secret| key_from_secret_bytes(&decode_secret_bytes(secret)))
            .collect();

        if keys.is_empty() {
            return Err(ConfigError::Missing("AUTH_COOKIE_SECRETS"));
        }

        Ok(Self { keys })
    }

    pub fn signing_key(&self) -> &Key {
        &self.keys[0]
    }

    pub fn verification_keys(&self) -> &[Key] {
        &self.keys
    }
}

fn decode_secret_bytes(secret: &str) -> Vec<u8> {
    STANDARD
        .decode(secret.as_bytes())
        .unwrap_or_else(|_| secret.as_bytes().to_vec())
}

fn key_from_secret_bytes(bytes: &[u8]) -> Key {
    if bytes.len() >= 64 {
        Key::from(&bytes[..64])
    } else {
        let digest = Sha512::digest(bytes);
        Key::from(digest.as_slice())
    }
}
