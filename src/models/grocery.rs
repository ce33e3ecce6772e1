use serde::Serialize;
use sqlx::FromRow;

use crate::validation::{FieldErrors, FormFields, ACTION_FIELD};

/// Ingredient of a meal-planned recipe, joined with its recipe.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct MealPlanIngredient {
    pub id: i64,
    pub recipe_id: i64,
    pub name: String,
    pub amount: Option<String>,
    pub recipe_name: String,
    pub meal_plan_multiplier: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListUse {
    /// Id of the recipe needing the ingredient.
    pub id: i64,
    pub amount: Option<String>,
    pub recipe_name: String,
    pub multiplier: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryListItem {
    pub id: i64,
    /// Lower-cased ingredient name the uses were grouped under.
    pub name: String,
    pub uses: Vec<GroceryListUse>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroceryListAction {
    CheckOffItem { name: String },
}

impl GroceryListAction {
    pub fn from_form(fields: &FormFields) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        match fields.action() {
            Some("checkOffItem") => {
                let name = fields.required("name", "Name is required", &mut errors);
                errors.finish(|| GroceryListAction::CheckOffItem {
                    name: name.unwrap_or_default(),
                })
            }
            _ => {
                errors.insert(ACTION_FIELD, "Unknown action");
                Err(errors)
            }
        }
    }
}
