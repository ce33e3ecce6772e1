use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::auth::middleware::CurrentUser;
use crate::error::Result;
use crate::models::grocery::GroceryListAction;
use crate::models::pantry::PantryItem;
use crate::validation::FormFields;
use crate::AppState;

pub async fn grocery_list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Value>> {
    let items = state.grocery_list_service.grocery_list(user.id).await?;
    Ok(Json(json!({ "groceryList": items })))
}

pub async fn grocery_list_action(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    fields: FormFields,
) -> Result<Json<PantryItem>> {
    match GroceryListAction::from_form(&fields)? {
        GroceryListAction::CheckOffItem { name } => Ok(Json(
            state
                .grocery_list_service
                .check_off_item(user.id, &name)
                .await?,
        )),
    }
}
