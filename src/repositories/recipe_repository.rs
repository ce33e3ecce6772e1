use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{pantry_repository::like_pattern, RepositoryError, RepositoryResult};
use crate::models::{
    grocery::MealPlanIngredient,
    recipe::{
        Ingredient, Recipe, RecipeField, RecipeFilter, RecipeSummary, RecipeUpdate,
        NEW_RECIPE_NAME, NEW_RECIPE_TOTAL_TIME, PLACEHOLDER_IMAGE_URL,
    },
};

const RECIPE_COLUMNS: &str = "id, user_id, name, instructions, total_time, image_url, \
                              meal_plan_multiplier, created_at, updated_at";
const SUMMARY_COLUMNS: &str = "id, name, total_time, image_url, meal_plan_multiplier";
const INGREDIENT_COLUMNS: &str = "id, recipe_id, name, amount, created_at";

#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn list_recipes(
        &self,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> RepositoryResult<Vec<RecipeSummary>>;
    /// Most recently updated recipes across all users.
    async fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<RecipeSummary>>;
    async fn find_recipe(&self, id: i64) -> RepositoryResult<Option<Recipe>>;
    async fn list_ingredients(&self, recipe_id: i64) -> RepositoryResult<Vec<Ingredient>>;
    async fn create_recipe(&self, user_id: i64) -> RepositoryResult<Recipe>;
    /// Saves the recipe columns and its listed ingredients atomically.
    async fn update_recipe(&self, id: i64, update: &RecipeUpdate) -> RepositoryResult<Recipe>;
    async fn update_field(
        &self,
        id: i64,
        field: RecipeField,
        value: &str,
    ) -> RepositoryResult<Recipe>;
    async fn delete_recipe(&self, id: i64) -> RepositoryResult<bool>;
    async fn set_meal_plan_multiplier(
        &self,
        id: i64,
        multiplier: Option<i64>,
    ) -> RepositoryResult<Recipe>;
    async fn clear_meal_plan(&self, user_id: i64) -> RepositoryResult<u64>;
    async fn find_ingredient(&self, id: i64) -> RepositoryResult<Option<Ingredient>>;
    async fn create_ingredient(
        &self,
        recipe_id: i64,
        name: &str,
        amount: Option<&str>,
    ) -> RepositoryResult<Ingredient>;
    async fn update_ingredient_name(&self, id: i64, name: &str) -> RepositoryResult<Ingredient>;
    async fn update_ingredient_amount(
        &self,
        id: i64,
        amount: Option<&str>,
    ) -> RepositoryResult<Ingredient>;
    async fn delete_ingredient(&self, id: i64) -> RepositoryResult<bool>;
    async fn list_meal_plan_ingredients(
        &self,
        user_id: i64,
    ) -> RepositoryResult<Vec<MealPlanIngredient>>;
}

pub struct SqliteRecipeRepository {
    pool: SqlitePool,
}

impl SqliteRecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get_recipe(&self, id: i64) -> RepositoryResult<Recipe> {
        self.find_recipe(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn get_ingredient(&self, id: i64) -> RepositoryResult<Ingredient> {
        self.find_ingredient(id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl RecipeRepository for SqliteRecipeRepository {
    async fn list_recipes(
        &self,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> RepositoryResult<Vec<RecipeSummary>> {
        let meal_plan_clause = if filter.meal_plan_only() {
            " AND meal_plan_multiplier IS NOT NULL"
        } else {
            ""
        };
        let recipes = sqlx::query_as::<_, RecipeSummary>(&format!(
            "SELECT {} FROM recipes \
             WHERE user_id = ? AND name LIKE ? ESCAPE '\\'{} \
             ORDER BY created_at DESC, id DESC",
            SUMMARY_COLUMNS, meal_plan_clause
        ))
        .bind(user_id)
        .bind(like_pattern(filter.q.as_deref().unwrap_or_default()))
        .fetch_all(&self.pool)
        .await?;
        Ok(recipes)
    }

    async fn list_recent(&self, limit: i64) -> RepositoryResult<Vec<RecipeSummary>> {
        let recipes = sqlx::query_as::<_, RecipeSummary>(&format!(
            "SELECT {} FROM recipes ORDER BY updated_at DESC, id DESC LIMIT ?",
            SUMMARY_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(recipes)
    }

    async fn find_recipe(&self, id: i64) -> RepositoryResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {} FROM recipes WHERE id = ?",
            RECIPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn list_ingredients(&self, recipe_id: i64) -> RepositoryResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {} FROM ingredients WHERE recipe_id = ? ORDER BY created_at ASC, id ASC",
            INGREDIENT_COLUMNS
        ))
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ingredients)
    }

    async fn create_recipe(&self, user_id: i64) -> RepositoryResult<Recipe> {
        let id = sqlx::query(
            "INSERT INTO recipes (user_id, name, total_time, image_url, instructions) \
             VALUES (?, ?, ?, ?, '')",
        )
        .bind(user_id)
        .bind(NEW_RECIPE_NAME)
        .bind(NEW_RECIPE_TOTAL_TIME)
        .bind(PLACEHOLDER_IMAGE_URL)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_recipe(id).await
    }

    async fn update_recipe(&self, id: i64, update: &RecipeUpdate) -> RepositoryResult<Recipe> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE recipes SET name = ?, total_time = ?, instructions = ?, \
             image_url = COALESCE(?, image_url), updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?",
        )
        .bind(update.name.as_str())
        .bind(update.total_time.as_str())
        .bind(update.instructions.as_str())
        .bind(update.image_url.as_deref())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for ingredient in &update.ingredients {
            // Ingredients of other recipes are left untouched.
            sqlx::query("UPDATE ingredients SET name = ?, amount = ? WHERE id = ? AND recipe_id = ?")
                .bind(ingredient.name.as_str())
                .bind(ingredient.amount.as_deref())
                .bind(ingredient.id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        self.get_recipe(id).await
    }

    async fn update_field(
        &self,
        id: i64,
        field: RecipeField,
        value: &str,
    ) -> RepositoryResult<Recipe> {
        let result = sqlx::query(&format!(
            "UPDATE recipes SET {} = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            field.column()
        ))
        .bind(value)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_recipe(id).await
    }

    async fn delete_recipe(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_meal_plan_multiplier(
        &self,
        id: i64,
        multiplier: Option<i64>,
    ) -> RepositoryResult<Recipe> {
        let result = sqlx::query(
            "UPDATE recipes SET meal_plan_multiplier = ?, updated_at = CURRENT_TIMESTAMP \
             WHERE id = ?",
        )
        .bind(multiplier)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_recipe(id).await
    }

    async fn clear_meal_plan(&self, user_id: i64) -> RepositoryResult<u64> {
        let result = sqlx::query(
            "UPDATE recipes SET meal_plan_multiplier = NULL \
             WHERE user_id = ? AND meal_plan_multiplier IS NOT NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find_ingredient(&self, id: i64) -> RepositoryResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(&format!(
            "SELECT {} FROM ingredients WHERE id = ?",
            INGREDIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ingredient)
    }

    async fn create_ingredient(
        &self,
        recipe_id: i64,
        name: &str,
        amount: Option<&str>,
    ) -> RepositoryResult<Ingredient> {
        let id = sqlx::query("INSERT INTO ingredients (recipe_id, name, amount) VALUES (?, ?, ?)")
            .bind(recipe_id)
            .bind(name)
            .bind(amount)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        self.get_ingredient(id).await
    }

    async fn update_ingredient_name(&self, id: i64, name: &str) -> RepositoryResult<Ingredient> {
        let result = sqlx::query("UPDATE ingredients SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_ingredient(id).await
    }

    async fn update_ingredient_amount(
        &self,
        id: i64,
        amount: Option<&str>,
    ) -> RepositoryResult<Ingredient> {
        let result = sqlx::query("UPDATE ingredients SET amount = ? WHERE id = ?")
            .bind(amount)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.get_ingredient(id).await
    }

    async fn delete_ingredient(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM ingredients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_meal_plan_ingredients(
        &self,
        user_id: i64,
    ) -> RepositoryResult<Vec<MealPlanIngredient>> {
        let ingredients = sqlx::query_as::<_, MealPlanIngredient>(
            "SELECT i.id, i.recipe_id, i.name, i.amount, \
                    r.name AS recipe_name, r.meal_plan_multiplier \
             FROM ingredients i \
             JOIN recipes r ON r.id = i.recipe_id \
             WHERE r.user_id = ? AND r.meal_plan_multiplier IS NOT NULL \
             ORDER BY i.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ingredients)
    }
}
