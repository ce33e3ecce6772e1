use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::auth::middleware::{redirect_if_authenticated, require_auth};
use crate::handlers;
use crate::middleware::{csrf_validation_middleware, security_headers};
use crate::services::magic_link_service::MAGIC_LINK_PATH;
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    // JSON surface: login required, X-CSRF-Token on writes
    let protected_routes = Router::new()
        .route("/app", get(handlers::app_home))
        .route(
            "/app/pantry",
            get(handlers::list_pantry).post(handlers::pantry_action),
        )
        .route(
            "/app/recipes",
            get(handlers::list_recipes).post(handlers::recipes_action),
        )
        .route(
            "/app/recipes/{id}",
            get(handlers::show_recipe).post(handlers::recipe_action),
        )
        .route(
            "/app/recipes/{id}/update-meal-plan",
            post(handlers::update_meal_plan),
        )
        .route(
            "/app/grocery-list",
            get(handlers::grocery_list).post(handlers::grocery_list_action),
        )
        .route("/settings/profile", get(handlers::profile_settings))
        .route(
            "/settings/app",
            get(handlers::app_settings).post(handlers::update_app_settings),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            csrf_validation_middleware,
        ))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let guest_routes = Router::new()
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_handler),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            redirect_if_authenticated,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route(
            MAGIC_LINK_PATH,
            get(handlers::validate_magic_link).post(handlers::complete_signup),
        )
        .route("/logout", post(handlers::logout_handler))
        .route("/discover", get(handlers::discover))
        .route("/discover/{id}", get(handlers::discover_recipe))
        .merge(guest_routes)
        .merge(protected_routes)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
