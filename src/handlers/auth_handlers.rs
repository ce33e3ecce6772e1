use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::auth::session::CookieSession;
use crate::error::Result;
use crate::middleware::csrf::{get_or_create_csrf_token, validate_csrf_form_field, CSRF_FORM_FIELD};
use crate::services::{
    auth_service::{AuthServiceError, MagicLinkOutcome},
    magic_link_service::MAGIC_LINK_PATH,
    user_service::UserServiceError,
};
use crate::validation::FormFields;
use crate::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
struct IndexTemplate {
    logged_in: bool,
    csrf_token: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    email: String,
    error: Option<String>,
    csrf_token: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/check_email.html")]
struct CheckEmailTemplate {
    email: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/complete_signup.html")]
struct CompleteSignupTemplate {
    email: String,
    action: String,
    first_name: String,
    last_name: String,
    first_name_error: Option<String>,
    last_name_error: Option<String>,
    csrf_token: String,
}

#[derive(Deserialize)]
pub struct MagicQuery {
    magic: Option<String>,
}

fn csrf_rejected() -> Response {
    (
        StatusCode::FORBIDDEN,
        Html("<html><body><h1>Invalid security token. Please refresh the page and try again.</h1></body></html>"),
    )
        .into_response()
}

/// Signup form action: the same callback URL, so the magic link is verified
/// again on submit.
fn signup_action(raw_query: Option<&str>) -> String {
    match raw_query {
        Some(query) if !query.is_empty() => format!("{}?{}", MAGIC_LINK_PATH, query),
        _ => MAGIC_LINK_PATH.to_string(),
    }
}

pub async fn index(mut session: CookieSession) -> Result<Response> {
    let logged_in = session.data.is_authenticated();
    let csrf_token = get_or_create_csrf_token(&mut session.data);
    let jar = session.commit()?;

    Ok((
        jar,
        IndexTemplate {
            logged_in,
            csrf_token,
        },
    )
        .into_response())
}

pub async fn login_page(mut session: CookieSession) -> Result<Response> {
    let csrf_token = get_or_create_csrf_token(&mut session.data);
    let jar = session.commit()?;

    Ok((
        jar,
        LoginTemplate {
            email: String::new(),
            error: None,
            csrf_token,
        },
    )
        .into_response())
}

pub async fn login_handler(
    State(state): State<AppState>,
    mut session: CookieSession,
    fields: FormFields,
) -> Result<Response> {
    let form_token = fields.get(CSRF_FORM_FIELD).unwrap_or_default();
    if validate_csrf_form_field(&mut session.data, form_token).is_err() {
        return Ok(csrf_rejected());
    }

    let email = fields.get("email").unwrap_or_default().trim().to_string();
    match state
        .auth_service
        .request_magic_link(&email, &mut session.data)
        .await
    {
        Ok(_) => {
            let jar = session.commit()?;
            Ok((jar, CheckEmailTemplate { email }).into_response())
        }
        Err(AuthServiceError::User(UserServiceError::InvalidEmail)) => {
            let csrf_token = get_or_create_csrf_token(&mut session.data);
            let jar = session.commit()?;
            Ok((
                StatusCode::BAD_REQUEST,
                jar,
                LoginTemplate {
                    email,
                    error: Some("Please enter a valid email address".to_string()),
                    csrf_token,
                },
            )
                .into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Magic-link callback.
pub async fn validate_magic_link(
    State(state): State<AppState>,
    mut session: CookieSession,
    Query(query): Query<MagicQuery>,
    RawQuery(raw_query): RawQuery,
) -> Result<Response> {
    let outcome = state
        .auth_service
        .complete_magic_link(query.magic.as_deref(), &mut session.data)
        .await?;

    match outcome {
        MagicLinkOutcome::Authenticated(_) => {
            let jar = session.commit()?;
            Ok((jar, Redirect::to("/app")).into_response())
        }
        MagicLinkOutcome::SignupRequired(payload) => {
            let csrf_token = get_or_create_csrf_token(&mut session.data);
            let jar = session.commit()?;
            Ok((
                jar,
                CompleteSignupTemplate {
                    email: payload.email,
                    action: signup_action(raw_query.as_deref()),
                    first_name: String::new(),
                    last_name: String::new(),
                    first_name_error: None,
                    last_name_error: None,
                    csrf_token,
                },
            )
                .into_response())
        }
    }
}

/// Signup form posted back to the magic-link callback.
pub async fn complete_signup(
    State(state): State<AppState>,
    mut session: CookieSession,
    Query(query): Query<MagicQuery>,
    RawQuery(raw_query): RawQuery,
    fields: FormFields,
) -> Result<Response> {
    let form_token = fields.get(CSRF_FORM_FIELD).unwrap_or_default();
    if validate_csrf_form_field(&mut session.data, form_token).is_err() {
        return Ok(csrf_rejected());
    }

    // The link must still be valid before the form errors are worth showing.
    let payload = state
        .auth_service
        .magic_links()
        .verify(query.magic.as_deref(), session.data.nonce.as_deref())?;

    let first_name = fields.get("firstName").unwrap_or_default().trim().to_string();
    let last_name = fields.get("lastName").unwrap_or_default().trim().to_string();
    let first_name_error = first_name
        .is_empty()
        .then(|| "First name is required".to_string());
    let last_name_error = last_name
        .is_empty()
        .then(|| "Last name is required".to_string());

    if first_name_error.is_some() || last_name_error.is_some() {
        let csrf_token = get_or_create_csrf_token(&mut session.data);
        let jar = session.commit()?;
        return Ok((
            StatusCode::BAD_REQUEST,
            jar,
            CompleteSignupTemplate {
                email: payload.email,
                action: signup_action(raw_query.as_deref()),
                first_name,
                last_name,
                first_name_error,
                last_name_error,
                csrf_token,
            },
        )
            .into_response());
    }

    let user = state
        .auth_service
        .complete_signup(query.magic.as_deref(), &mut session.data, &first_name, &last_name)
        .await?;
    tracing::info!("Completed signup for user {}", user.id);

    let jar = session.commit()?;
    Ok((jar, Redirect::to("/app")).into_response())
}

pub async fn logout_handler(session: CookieSession, fields: FormFields) -> Response {
    let mut data = session.data.clone();
    let form_token = fields.get(CSRF_FORM_FIELD).unwrap_or_default();
    if validate_csrf_form_field(&mut data, form_token).is_err() {
        return csrf_rejected();
    }

    if let Some(user_id) = session.data.user_id {
        tracing::info!("User {} logged out", user_id);
    }
    (session.destroy(), Redirect::to("/")).into_response()
}

