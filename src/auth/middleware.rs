use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::session::CookieSession;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/app";

/// The logged-in user, placed in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Not logged in"))
    }
}

async fn session_user(state: &AppState, session: &CookieSession) -> Option<User> {
    let user_id = session.data.user_id?;
    match state.user_service.find_user_by_id(user_id).await {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!("Session user {} is not usable: {}", user_id, e);
            None
        }
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    session: CookieSession,
    mut request: Request,
    next: Next,
) -> Response {
    match session_user(&state, &session).await {
        Some(user) => {
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        None => {
            // A session pointing at a deleted user is dropped with the redirect
            let jar = if session.data.is_authenticated() {
                Some(session.destroy())
            } else {
                None
            };
            (jar, Redirect::to(LOGIN_PATH)).into_response()
        }
    }
}

pub async fn redirect_if_authenticated(
    State(state): State<AppState>,
    session: CookieSession,
    request: Request,
    next: Next,
) -> Response {
    if session_user(&state, &session).await.is_some() {
        Redirect::to(HOME_PATH).into_response()
    } else {
        next.run(request).await
    }
}
