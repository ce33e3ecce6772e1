use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::CurrentUser;
use crate::error::Result;
use crate::models::pantry::{PantryAction, PantryActionOutcome};
use crate::validation::FormFields;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PantryQuery {
    q: Option<String>,
}

pub async fn list_pantry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PantryQuery>,
) -> Result<Json<Value>> {
    let shelves = state
        .pantry_service
        .list_shelves(user.id, query.q.as_deref())
        .await?;
    Ok(Json(json!({ "shelves": shelves })))
}

pub async fn pantry_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    fields: FormFields,
) -> Result<Json<PantryActionOutcome>> {
    let action = PantryAction::from_form(&fields)?;
    tracing::debug!("User {} pantry action {:?}", user.id, action);
    Ok(Json(state.pantry_service.apply(user.id, action).await?))
}
