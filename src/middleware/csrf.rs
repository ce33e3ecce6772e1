use axum::{
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::session::{CookieSession, SessionData};

pub const CSRF_FORM_FIELD: &str = "csrf_token";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

/// CSRF token kept in the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfToken {
    pub value: String,
    pub created_at: i64,
}

impl CsrfToken {
    pub fn new() -> Self {
        Self {
            value: Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Tokens live for 24 hours.
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now - self.created_at > 86400
    }
}

impl Default for CsrfToken {
    fn default() -> Self {
        Self::new()
    }
}

fn prefix(value: &str) -> &str {
    value.get(..8).unwrap_or(value)
}

/// Replaces the session's token. The caller commits the session.
pub fn generate_csrf_token(session: &mut SessionData) -> String {
    let token = CsrfToken::new();
    let value = token.value.clone();
    session.csrf_token = Some(token);
    debug!("Generated new CSRF token: {}", prefix(&value));
    value
}

pub fn get_or_create_csrf_token(session: &mut SessionData) -> String {
    match &session.csrf_token {
        Some(existing) if !existing.is_expired() => existing.value.clone(),
        _ => generate_csrf_token(session),
    }
}

fn check_token(session: &SessionData, provided: &str) -> Result<(), CsrfError> {
    let stored = match &session.csrf_token {
        Some(token) if token.is_expired() => {
            warn!("CSRF token expired");
            return Err(CsrfError::new("token expired"));
        }
        Some(token) => token,
        None => {
            warn!("No CSRF token in session");
            return Err(CsrfError::new("missing session token"));
        }
    };

    if provided != stored.value {
        warn!(
            "CSRF token mismatch: expected {}, got {}",
            prefix(&stored.value),
            prefix(provided)
        );
        return Err(CsrfError::new("token mismatch"));
    }

    Ok(())
}

/// Checks a token posted by an HTML form and rotates it on success.
pub fn validate_csrf_form_field(session: &mut SessionData, form_token: &str) -> Result<(), CsrfError> {
    check_token(session, form_token)?;
    debug!("CSRF form token validated, rotating");
    generate_csrf_token(session);
    Ok(())
}

/// Requires `X-CSRF-Token` on state-changing requests.
///
/// The JSON surface reads its token once from `GET /app`; header tokens are
/// not rotated so concurrent requests from one page keep working.
pub async fn csrf_validation_middleware(
    session: CookieSession,
    request: Request,
    next: Next,
) -> Result<Response, CsrfError> {
    let method = request.method().clone();
    if matches!(method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(next.run(request).await);
    }

    let path = request.uri().path().to_string();
    debug!("Validating CSRF for {} {}", method, path);

    let provided = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            warn!("No CSRF header for {} {}", method, path);
            CsrfError::new("missing header")
        })?;

    check_token(&session.data, provided)?;
    Ok(next.run(request).await)
}

#[derive(Debug)]
pub struct CsrfError {
    pub message: String,
}

impl CsrfError {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

impl IntoResponse for CsrfError {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(json!({ "message": format!("CSRF validation failed: {}", self.message) })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csrf_token_generation() {
        let mut session = SessionData::default();
        let token1 = generate_csrf_token(&mut session);
        let token2 = generate_csrf_token(&mut session);
        assert!(!token1.is_empty());
        assert_ne!(token1, token2, "Tokens should be unique");
        assert_eq!(session.csrf_token.unwrap().value, token2);
    }

    #[test]
    fn test_csrf_token_expiry() {
        let token = CsrfToken {
            value: "test".to_string(),
            created_at: chrono::Utc::now().timestamp() - 100000,
        };
        assert!(token.is_expired());
        assert!(!CsrfToken::new().is_expired());
    }

    #[test]
    fn test_get_or_create_reuses_live_token() {
        let mut session = SessionData::default();
        let token1 = get_or_create_csrf_token(&mut session);
        let token2 = get_or_create_csrf_token(&mut session);
        assert_eq!(token1, token2);

        session.csrf_token = Some(CsrfToken {
            value: token1.clone(),
            created_at: 0,
        });
        assert_ne!(get_or_create_csrf_token(&mut session), token1);
    }

    #[test]
    fn test_form_field_validation_rotates() {
        let mut session = SessionData::default();
        let token = get_or_create_csrf_token(&mut session);

        assert!(validate_csrf_form_field(&mut session, "wrong").is_err());
        assert!(validate_csrf_form_field(&mut session, &token).is_ok());
        // Replay of the used token fails.
        assert!(validate_csrf_form_field(&mut session, &token).is_err());
    }

    #[test]
    fn test_form_field_validation_requires_session_token() {
        let mut session = SessionData::default();
        let err = validate_csrf_form_field(&mut session, "anything").unwrap_err();
        assert_eq!(err.message, "missing session token");
    }
}
