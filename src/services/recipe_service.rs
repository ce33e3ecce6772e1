use std::sync::Arc;

use serde::Serialize;

use crate::models::recipe::{
    Ingredient, MealPlanAction, Recipe, RecipeAction, RecipeFilter, RecipeSummary,
    RecipeWithIngredients,
};
use crate::repositories::{RecipeRepository, RepositoryError};

pub const VIEW_DENIED: &str = "You're not authorized to view this recipe";
pub const CHANGE_DENIED: &str = "You're not authorized to make changes on this recipe";

#[derive(Debug, thiserror::Error)]
pub enum RecipeServiceError {
    #[error("Recipe not found")]
    RecipeNotFound,
    #[error("Ingredient not found")]
    IngredientNotFound,
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

/// Response body of a recipe mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecipeActionOutcome {
    Recipe(Recipe),
    Ingredient(Ingredient),
    IngredientDeleted { deleted: bool },
    /// The recipe itself is gone; callers redirect to the list.
    RecipeDeleted,
}

pub struct RecipeService {
    repository: Arc<dyn RecipeRepository>,
}

impl RecipeService {
    pub fn new(repository: Arc<dyn RecipeRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(
        &self,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<RecipeSummary>, RecipeServiceError> {
        Ok(self.repository.list_recipes(user_id, filter).await?)
    }

    pub async fn create(&self, user_id: i64) -> Result<Recipe, RecipeServiceError> {
        let recipe = self.repository.create_recipe(user_id).await?;
        tracing::debug!("User {} created recipe {}", user_id, recipe.id);
        Ok(recipe)
    }

    pub async fn clear_meal_plan(&self, user_id: i64) -> Result<u64, RecipeServiceError> {
        Ok(self.repository.clear_meal_plan(user_id).await?)
    }

    /// Recipe with its ingredients, readable only by its owner.
    pub async fn get_for_owner(
        &self,
        user_id: i64,
        recipe_id: i64,
    ) -> Result<RecipeWithIngredients, RecipeServiceError> {
        let recipe = self.owned_recipe(user_id, recipe_id, VIEW_DENIED).await?;
        let ingredients = self.repository.list_ingredients(recipe.id).await?;
        Ok(RecipeWithIngredients {
            recipe,
            ingredients,
        })
    }

    /// Recipe with its ingredients for anyone, used by the public pages.
    pub async fn get_public(
        &self,
        recipe_id: i64,
    ) -> Result<RecipeWithIngredients, RecipeServiceError> {
        let recipe = self
            .repository
            .find_recipe(recipe_id)
            .await?
            .ok_or(RecipeServiceError::RecipeNotFound)?;
        let ingredients = self.repository.list_ingredients(recipe.id).await?;
        Ok(RecipeWithIngredients {
            recipe,
            ingredients,
        })
    }

    pub async fn apply(
        &self,
        user_id: i64,
        recipe_id: i64,
        action: RecipeAction,
    ) -> Result<RecipeActionOutcome, RecipeServiceError> {
        self.owned_recipe(user_id, recipe_id, CHANGE_DENIED).await?;

        let outcome = match action {
            RecipeAction::SaveRecipe(update) => {
                RecipeActionOutcome::Recipe(self.repository.update_recipe(recipe_id, &update).await?)
            }
            RecipeAction::CreateIngredient { name, amount } => RecipeActionOutcome::Ingredient(
                self.repository
                    .create_ingredient(recipe_id, &name, amount.as_deref())
                    .await?,
            ),
            RecipeAction::DeleteRecipe => {
                self.repository.delete_recipe(recipe_id).await?;
                RecipeActionOutcome::RecipeDeleted
            }
            RecipeAction::SaveField { field, value } => RecipeActionOutcome::Recipe(
                self.repository.update_field(recipe_id, field, &value).await?,
            ),
            RecipeAction::SaveIngredientAmount { id, amount } => {
                self.recipe_ingredient(recipe_id, id).await?;
                RecipeActionOutcome::Ingredient(
                    self.repository
                        .update_ingredient_amount(id, amount.as_deref())
                        .await?,
                )
            }
            RecipeAction::SaveIngredientName { id, name } => {
                self.recipe_ingredient(recipe_id, id).await?;
                RecipeActionOutcome::Ingredient(
                    self.repository.update_ingredient_name(id, &name).await?,
                )
            }
            RecipeAction::DeleteIngredient { id } => {
                match self.repository.find_ingredient(id).await? {
                    None => RecipeActionOutcome::IngredientDeleted { deleted: false },
                    Some(ingredient) if ingredient.recipe_id != recipe_id => {
                        return Err(RecipeServiceError::IngredientNotFound)
                    }
                    Some(_) => RecipeActionOutcome::IngredientDeleted {
                        deleted: self.repository.delete_ingredient(id).await?,
                    },
                }
            }
        };
        Ok(outcome)
    }

    pub async fn update_meal_plan(
        &self,
        user_id: i64,
        recipe_id: i64,
        action: MealPlanAction,
    ) -> Result<Recipe, RecipeServiceError> {
        self.owned_recipe(user_id, recipe_id, CHANGE_DENIED).await?;
        let multiplier = match action {
            MealPlanAction::UpdateMealPlan { multiplier } => Some(multiplier),
            MealPlanAction::RemoveFromMealPlan => None,
        };
        Ok(self
            .repository
            .set_meal_plan_multiplier(recipe_id, multiplier)
            .await?)
    }

    async fn owned_recipe(
        &self,
        user_id: i64,
        recipe_id: i64,
        denied: &'static str,
    ) -> Result<Recipe, RecipeServiceError> {
        let recipe = self
            .repository
            .find_recipe(recipe_id)
            .await?
            .ok_or(RecipeServiceError::RecipeNotFound)?;
        if recipe.user_id != user_id {
            tracing::warn!("User {} denied access to recipe {}", user_id, recipe_id);
            return Err(RecipeServiceError::NotAuthorized(denied));
        }
        Ok(recipe)
    }

    async fn recipe_ingredient(
        &self,
        recipe_id: i64,
        ingredient_id: i64,
    ) -> Result<Ingredient, RecipeServiceError> {
        match self.repository.find_ingredient(ingredient_id).await? {
            Some(ingredient) if ingredient.recipe_id == recipe_id => Ok(ingredient),
            _ => Err(RecipeServiceError::IngredientNotFound),
        }
    }
}
