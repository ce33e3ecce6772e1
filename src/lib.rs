pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod validation;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use auth::session::SessionManager;
use config::{
    session::{SessionConfig, SessionKeys},
    AppConfig, ConfigError,
};
use repositories::{
    SqliteConsumedNonceRepository, SqlitePantryRepository, SqliteRecipeRepository,
    SqliteUserRepository,
};
use services::{
    auth_service::AuthService, discover_service::DiscoverService, email_service::EmailService,
    grocery_list_service::GroceryListService, magic_link_service::MagicLinkService,
    pantry_service::PantryService, recipe_service::RecipeService, token_cipher::TokenCipher,
    user_service::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionManager>,
    pub user_service: Arc<UserService>,
    pub auth_service: Arc<AuthService>,
    pub pantry_service: Arc<PantryService>,
    pub recipe_service: Arc<RecipeService>,
    pub grocery_list_service: Arc<GroceryListService>,
    pub discover_service: Arc<DiscoverService>,
    pub pool: SqlitePool,
}

impl AppState {
    /// Wires repositories and services on top of an already migrated pool.
    ///
    /// Fails when the magic-link secret or the cookie secrets cannot be turned
    /// into keys, so a misconfigured process never starts serving requests.
    pub fn new(
        config: AppConfig,
        pool: SqlitePool,
        email_service: Arc<dyn EmailService>,
    ) -> Result<Self, ConfigError> {
        let cipher = TokenCipher::from_secret(&config.magic_link_secret).map_err(|e| {
            ConfigError::Invalid {
                key: "MAGIC_LINK_SECRET",
                reason: e.to_string(),
            }
        })?;
        let magic_links = Arc::new(MagicLinkService::new(cipher, &config.origin));

        let session_keys = SessionKeys::from_secrets(config.cookie_secrets.as_slice())?;
        let session_config = SessionConfig::for_environment(&config.environment);
        let sessions = Arc::new(SessionManager::new(session_config, session_keys));

        let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
        let nonce_repository = Arc::new(SqliteConsumedNonceRepository::new(pool.clone()));
        let pantry_repository = Arc::new(SqlitePantryRepository::new(pool.clone()));
        let recipe_repository = Arc::new(SqliteRecipeRepository::new(pool.clone()));

        let user_service = Arc::new(UserService::new(user_repository));
        let auth_service = Arc::new(AuthService::new(
            magic_links,
            user_service.clone(),
            nonce_repository,
            email_service,
        ));
        let pantry_service = Arc::new(PantryService::new(pantry_repository.clone()));
        let recipe_service = Arc::new(RecipeService::new(recipe_repository.clone()));
        let grocery_list_service = Arc::new(GroceryListService::new(
            recipe_repository.clone(),
            pantry_repository,
            pantry_service.clone(),
        ));
        let discover_service = Arc::new(DiscoverService::new(recipe_repository));

        Ok(Self {
            config: Arc::new(config),
            sessions,
            user_service,
            auth_service,
            pantry_service,
            recipe_service,
            grocery_list_service,
            discover_service,
            pool,
        })
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
