use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::auth::{middleware::CurrentUser, session::CookieSession};
use crate::error::Result;
use crate::middleware::csrf::get_or_create_csrf_token;
use crate::models::Profile;

/// Entry point of the JSON surface: the profile plus the token the client
/// sends back as `X-CSRF-Token`.
pub async fn app_home(
    CurrentUser(user): CurrentUser,
    mut session: CookieSession,
) -> Result<Response> {
    let csrf_token = get_or_create_csrf_token(&mut session.data);
    let jar = session.commit()?;

    Ok((
        jar,
        Json(json!({
            "user": Profile::from(&user),
            "csrfToken": csrf_token,
        })),
    )
        .into_response())
}
