use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::auth::session::SessionError;
use crate::repositories::RepositoryError;
use crate::services::{
    auth_service::AuthServiceError, discover_service::DiscoverError, email_service::EmailError,
    magic_link_service::MagicLinkError, pantry_service::PantryServiceError,
    recipe_service::RecipeServiceError, user_service::UserServiceError,
};
use crate::validation::FieldErrors;

// Type alias for Result with our AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("{0}")]
    NotFound(String),

    /// Ownership failures. Reported as 401 with a message, like the rest of
    /// the app's authorization checks.
    #[error("{0}")]
    Unauthorized(String),

    /// Field-level ownership failures, reported as 401 with field errors.
    #[error("Not permitted")]
    NotPermitted(FieldErrors),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Magic link error: {0}")]
    MagicLink(#[from] MagicLinkError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Internal server error")]
    InternalError,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Unauthorized(message.into())
    }

    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field, message);
        AppError::Validation(errors)
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::InvalidEmail => AppError::field("email", "Invalid email address"),
            UserServiceError::MissingName(field) => {
                AppError::field(field, "This field is required")
            }
            UserServiceError::EmailTaken => {
                AppError::field("email", "An account already exists for this email")
            }
            UserServiceError::UserNotFound => AppError::not_found("User not found"),
            UserServiceError::RepositoryError(e) => AppError::Repository(e),
        }
    }
}

impl From<PantryServiceError> for AppError {
    fn from(err: PantryServiceError) -> Self {
        match err {
            PantryServiceError::NotPermitted { field, message } => {
                let mut errors = FieldErrors::new();
                errors.insert(field, message);
                AppError::NotPermitted(errors)
            }
            PantryServiceError::ShelfNotFound => AppError::not_found("Shelf not found"),
            PantryServiceError::RepositoryError(e) => AppError::Repository(e),
        }
    }
}

impl From<RecipeServiceError> for AppError {
    fn from(err: RecipeServiceError) -> Self {
        match err {
            RecipeServiceError::RecipeNotFound | RecipeServiceError::IngredientNotFound => {
                AppError::not_found(err.to_string())
            }
            RecipeServiceError::NotAuthorized(message) => AppError::unauthorized(message),
            RecipeServiceError::RepositoryError(e) => AppError::Repository(e),
        }
    }
}

impl From<DiscoverError> for AppError {
    fn from(err: DiscoverError) -> Self {
        match err {
            DiscoverError::NotFound => AppError::not_found("Recipe not found"),
            DiscoverError::RepositoryError(e) => AppError::Repository(e),
            DiscoverError::Serialize(e) => {
                tracing::error!("Failed to serialize recipe: {}", e);
                AppError::InternalError
            }
        }
    }
}

impl From<AuthServiceError> for AppError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::MagicLink(e) => AppError::MagicLink(e),
            AuthServiceError::User(e) => e.into(),
            AuthServiceError::Email(e) => AppError::Email(e),
            AuthServiceError::NonceStore(e) => AppError::Repository(e),
            AuthServiceError::Cipher(e) => {
                tracing::error!("Magic link encryption failed: {}", e);
                AppError::InternalError
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MagicLink(err) => err.into_response(),
            AppError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::NotPermitted(errors) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "errors": errors }))).into_response()
            }
            AppError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            AppError::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": message }))).into_response()
            }
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
