use axum::{
    extract::{Path, Query, RawQuery, State},
    http::header::CACHE_CONTROL,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::{json, Value};

use crate::auth::middleware::CurrentUser;
use crate::error::Result;
use crate::models::recipe::{MealPlanAction, RecipeAction, RecipeFilter, RecipesAction};
use crate::services::recipe_service::RecipeActionOutcome;
use crate::validation::FormFields;
use crate::AppState;

const RECIPES_PATH: &str = "/app/recipes";

pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<RecipeFilter>,
) -> Result<Json<Value>> {
    let recipes = state.recipe_service.list(user.id, &filter).await?;
    Ok(Json(json!({ "recipes": recipes })))
}

pub async fn recipes_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    RawQuery(raw_query): RawQuery,
    fields: FormFields,
) -> Result<Redirect> {
    match RecipesAction::from_form(&fields)? {
        RecipesAction::CreateRecipe => {
            let recipe = state.recipe_service.create(user.id).await?;
            // Keep the list's search and filter when opening the new recipe
            let location = match raw_query.filter(|q| !q.is_empty()) {
                Some(query) => format!("{}/{}?{}", RECIPES_PATH, recipe.id, query),
                None => format!("{}/{}", RECIPES_PATH, recipe.id),
            };
            Ok(Redirect::to(&location))
        }
        RecipesAction::ClearMealPlan => {
            let cleared = state.recipe_service.clear_meal_plan(user.id).await?;
            tracing::debug!("User {} cleared {} meal plan entries", user.id, cleared);
            Ok(Redirect::to(RECIPES_PATH))
        }
    }
}

pub async fn show_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
) -> Result<Response> {
    let recipe = state.recipe_service.get_for_owner(user.id, recipe_id).await?;
    Ok((
        [(CACHE_CONTROL, "max-age=10")],
        Json(json!({ "recipe": recipe })),
    )
        .into_response())
}

pub async fn recipe_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
    fields: FormFields,
) -> Result<Response> {
    let action = RecipeAction::from_form(&fields)?;
    match state.recipe_service.apply(user.id, recipe_id, action).await? {
        RecipeActionOutcome::RecipeDeleted => Ok(Redirect::to(RECIPES_PATH).into_response()),
        outcome => Ok(Json(outcome).into_response()),
    }
}

pub async fn update_meal_plan(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<i64>,
    fields: FormFields,
) -> Result<Json<Value>> {
    let action = MealPlanAction::from_form(&fields)?;
    let recipe = state
        .recipe_service
        .update_meal_plan(user.id, recipe_id, action)
        .await?;
    Ok(Json(json!({ "recipe": recipe })))
}
