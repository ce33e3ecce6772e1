use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validation::{parse_id, FieldErrors, FormFields, ACTION_FIELD};

pub const NEW_RECIPE_NAME: &str = "New Recipe";
pub const NEW_RECIPE_TOTAL_TIME: &str = "0 minutes";
pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/150?text=Pantry+Recipes";
pub const MEAL_PLAN_ONLY_FILTER: &str = "mealPlanOnly";
const DELETE_INGREDIENT_PREFIX: &str = "deleteIngredient.";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub instructions: String,
    pub total_time: String,
    pub image_url: String,
    pub meal_plan_multiplier: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: i64,
    pub recipe_id: i64,
    pub name: String,
    pub amount: Option<String>,
    pub created_at: String,
}

/// List view of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub total_time: String,
    pub image_url: String,
    pub meal_plan_multiplier: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeWithIngredients {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecipeFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
}

impl RecipeFilter {
    pub fn meal_plan_only(&self) -> bool {
        self.filter.as_deref() == Some(MEAL_PLAN_ONLY_FILTER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientUpdate {
    pub id: i64,
    pub amount: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeUpdate {
    pub name: String,
    pub total_time: String,
    pub instructions: String,
    pub image_url: Option<String>,
    pub ingredients: Vec<IngredientUpdate>,
}

/// Single recipe column editable on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeField {
    Name,
    TotalTime,
    Instructions,
}

impl RecipeField {
    pub fn column(&self) -> &'static str {
        match self {
            RecipeField::Name => "name",
            RecipeField::TotalTime => "total_time",
            RecipeField::Instructions => "instructions",
        }
    }
}

/// Mutations accepted by `POST /app/recipes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipesAction {
    CreateRecipe,
    ClearMealPlan,
}

impl RecipesAction {
    pub fn from_form(fields: &FormFields) -> Result<Self, FieldErrors> {
        match fields.action() {
            Some("createRecipe") => Ok(RecipesAction::CreateRecipe),
            Some("clearMealPlan") => Ok(RecipesAction::ClearMealPlan),
            _ => Err(unknown_action()),
        }
    }
}

/// Mutations accepted by `POST /app/recipes/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeAction {
    SaveRecipe(RecipeUpdate),
    CreateIngredient {
        name: String,
        amount: Option<String>,
    },
    DeleteRecipe,
    SaveField {
        field: RecipeField,
        value: String,
    },
    SaveIngredientAmount {
        id: i64,
        amount: Option<String>,
    },
    SaveIngredientName {
        id: i64,
        name: String,
    },
    DeleteIngredient {
        id: i64,
    },
}

impl RecipeAction {
    pub fn from_form(fields: &FormFields) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let action = fields.action().unwrap_or_default();

        if let Some(raw_id) = action.strip_prefix(DELETE_INGREDIENT_PREFIX) {
            return match parse_id(raw_id) {
                Some(id) => Ok(RecipeAction::DeleteIngredient { id }),
                None => {
                    errors.insert(ACTION_FIELD, "Invalid ingredient id");
                    Err(errors)
                }
            };
        }

        match action {
            "saveRecipe" => parse_save_recipe(fields),
            "createIngredient" => {
                let name = fields.required("newIngredientName", "Name is required", &mut errors);
                let amount = fields.optional("newIngredientAmount");
                errors.finish(|| RecipeAction::CreateIngredient {
                    name: name.unwrap_or_default(),
                    amount,
                })
            }
            "deleteRecipe" => Ok(RecipeAction::DeleteRecipe),
            "saveName" => save_field(fields, RecipeField::Name, "name", "Name is required"),
            "saveTotalTime" => save_field(
                fields,
                RecipeField::TotalTime,
                "totalTime",
                "Total time is required",
            ),
            "saveInstructions" => save_field(
                fields,
                RecipeField::Instructions,
                "instructions",
                "Instructions is required",
            ),
            "saveIngredientAmount" => {
                let id = fields.id("id", &mut errors);
                let amount = fields.optional("amount");
                errors.finish(|| RecipeAction::SaveIngredientAmount {
                    id: id.unwrap_or_default(),
                    amount,
                })
            }
            "saveIngredientName" => {
                let id = fields.id("id", &mut errors);
                let name = fields.required("name", "Ingredient name is required", &mut errors);
                errors.finish(|| RecipeAction::SaveIngredientName {
                    id: id.unwrap_or_default(),
                    name: name.unwrap_or_default(),
                })
            }
            _ => Err(unknown_action()),
        }
    }
}

fn save_field(
    fields: &FormFields,
    field: RecipeField,
    name: &str,
    message: &str,
) -> Result<RecipeAction, FieldErrors> {
    let mut errors = FieldErrors::new();
    let value = fields.required(name, message, &mut errors);
    errors.finish(|| RecipeAction::SaveField {
        field,
        value: value.unwrap_or_default(),
    })
}

fn parse_save_recipe(fields: &FormFields) -> Result<RecipeAction, FieldErrors> {
    let mut errors = FieldErrors::new();
    let name = fields.required("name", "Name is required", &mut errors);
    let total_time = fields.required("totalTime", "Total time is required", &mut errors);
    let instructions = fields.required("instructions", "Instructions is required", &mut errors);
    let image_url = fields.optional("imageUrl");

    let ids = fields.get_all("ingredientIds");
    let amounts = fields.get_all("ingredientAmounts");
    let names = fields.get_all("ingredientNames");

    let mut ingredients = Vec::with_capacity(ids.len());
    if ids.len() != amounts.len() || ids.len() != names.len() {
        errors.insert("ingredientIds", "Ingredient amounts and names must match");
    } else {
        for (index, ((id, amount), name)) in ids.iter().zip(amounts).zip(names).enumerate() {
            let id = parse_id(id);
            if id.is_none() {
                errors.insert(format!("ingredientIds.{}", index), "Ingredient ID is required");
            }
            let name = name.trim();
            if name.is_empty() {
                errors.insert(
                    format!("ingredientNames.{}", index),
                    "Ingredient name is required",
                );
            }
            let amount = amount.trim();
            ingredients.push(IngredientUpdate {
                id: id.unwrap_or_default(),
                amount: (!amount.is_empty()).then(|| amount.to_string()),
                name: name.to_string(),
            });
        }
    }

    errors.finish(|| {
        RecipeAction::SaveRecipe(RecipeUpdate {
            name: name.unwrap_or_default(),
            total_time: total_time.unwrap_or_default(),
            instructions: instructions.unwrap_or_default(),
            image_url,
            ingredients,
        })
    })
}

/// Mutations accepted by `POST /app/recipes/{id}/update-meal-plan`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MealPlanAction {
    UpdateMealPlan { multiplier: i64 },
    RemoveFromMealPlan,
}

impl MealPlanAction {
    pub fn from_form(fields: &FormFields) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        match fields.action() {
            Some("updateMealPlan") => {
                let raw = fields.get("mealPlanMultiplier").map(str::trim).unwrap_or_default();
                match raw.parse::<i64>() {
                    Ok(multiplier) if multiplier >= 1 => {
                        Ok(MealPlanAction::UpdateMealPlan { multiplier })
                    }
                    Ok(_) => {
                        errors.insert(
                            "mealPlanMultiplier",
                            "Meal plan multiplier must be at least 1",
                        );
                        Err(errors)
                    }
                    Err(_) => {
                        errors.insert(
                            "mealPlanMultiplier",
                            "Meal plan multiplier must be a whole number",
                        );
                        Err(errors)
                    }
                }
            }
            Some("removeFromMealPlan") => Ok(MealPlanAction::RemoveFromMealPlan),
            _ => Err(unknown_action()),
        }
    }
}

fn unknown_action() -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(ACTION_FIELD, "Unknown action");
    errors
}
