use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use time::Duration;

use crate::auth::middleware::CurrentUser;
use crate::config::session::THEME_COOKIE_NAME;
use crate::error::{AppError, Result};
use crate::models::Profile;
use crate::validation::FormFields;

pub const THEMES: [&str; 6] = ["red", "orange", "yellow", "green", "blue", "purple"];
pub const DEFAULT_THEME: &str = "green";

/// Theme stored in the unsigned theme cookie, falling back to the default.
pub fn current_theme(jar: &CookieJar) -> &'static str {
    jar.get(THEME_COOKIE_NAME)
        .and_then(|cookie| THEMES.iter().find(|theme| **theme == cookie.value()))
        .copied()
        .unwrap_or(DEFAULT_THEME)
}

pub async fn profile_settings(CurrentUser(user): CurrentUser) -> Json<Profile> {
    Json(Profile::from(&user))
}

pub async fn app_settings(jar: CookieJar) -> Json<Value> {
    Json(json!({ "theme": current_theme(&jar) }))
}

pub async fn update_app_settings(jar: CookieJar, fields: FormFields) -> Result<Response> {
    let theme = fields.get("theme").map(str::trim).unwrap_or_default();
    let Some(theme) = THEMES.iter().find(|candidate| **candidate == theme) else {
        return Err(AppError::field("theme", "Invalid theme"));
    };

    // Not tied to the session, so the theme survives logout.
    let cookie = Cookie::build((THEME_COOKIE_NAME, *theme))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(365))
        .build();

    Ok((jar.add(cookie), Redirect::to("/settings/app")).into_response())
}
