//! Cookie-held session state.
//!
//! The whole session lives in one signed cookie: the server keeps nothing
//! between requests. The value is base64url(JSON) of [`SessionData`], signed
//! with the newest key from [`SessionKeys`] and accepted under any of them.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, SignedCookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::config::session::{SessionConfig, SessionKeys};
use crate::middleware::csrf::CsrfToken;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Pending magic-link nonce, cleared once a link is consumed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csrf_token: Option<CsrfToken>,
}

impl SessionData {
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[derive(Debug)]
pub struct SessionManager {
    config: SessionConfig,
    keys: SessionKeys,
}

impl SessionManager {
    pub fn new(config: SessionConfig, keys: SessionKeys) -> Self {
        Self { config, keys }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.name
    }

    /// Reads the session from request headers.
    ///
    /// A missing, tampered or undecodable cookie yields an empty session.
    pub fn load(&self, headers: &HeaderMap) -> SessionData {
        let cookie = self.keys.verification_keys().iter().find_map(|key| {
            SignedCookieJar::from_headers(headers, key.clone()).get(&self.config.name)
        });

        let Some(cookie) = cookie else {
            return SessionData::default();
        };

        match decode(cookie.value()) {
            Some(data) => data,
            None => {
                tracing::debug!("Discarding undecodable session cookie");
                SessionData::default()
            }
        }
    }

    /// Signs `data` into a cookie jar ready to be returned with a response.
    pub fn commit(&self, data: &SessionData) -> Result<SignedCookieJar, SessionError> {
        let value = URL_SAFE_NO_PAD.encode(serde_json::to_vec(data)?);
        let cookie = Cookie::build((self.config.name.clone(), value))
            .path("/")
            .http_only(self.config.http_only)
            .secure(self.config.secure)
            .same_site(self.config.same_site)
            .max_age(self.config.max_age)
            .build();

        Ok(SignedCookieJar::new(self.keys.signing_key().clone()).add(cookie))
    }

    /// Jar that clears the session cookie.
    ///
    /// The jar starts empty, so `remove` would emit nothing; an expired
    /// cookie is added instead.
    pub fn destroy(&self) -> SignedCookieJar {
        let cookie = Cookie::build((self.config.name.clone(), ""))
            .path("/")
            .http_only(self.config.http_only)
            .secure(self.config.secure)
            .same_site(self.config.same_site)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build();
        SignedCookieJar::new(self.keys.signing_key().clone()).add(cookie)
    }
}

fn decode(value: &str) -> Option<SessionData> {
    let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Session extractor: the decoded data plus the manager that wrote it.
pub struct CookieSession {
    pub data: SessionData,
    manager: Arc<SessionManager>,
}

impl CookieSession {
    pub fn commit(&self) -> Result<SignedCookieJar, SessionError> {
        self.manager.commit(&self.data)
    }

    pub fn destroy(&self) -> SignedCookieJar {
        self.manager.destroy()
    }
}

impl<S> FromRequestParts<S> for CookieSession
where
    Arc<SessionManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let manager = Arc::<SessionManager>::from_ref(state);
        let data = manager.load(&parts.headers);
        Ok(Self { data, manager })
    }
}
