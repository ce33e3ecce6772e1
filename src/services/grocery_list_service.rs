//! Grocery list derived from the meal plan.
//!
//! Every ingredient of a meal-planned recipe that the pantry does not already
//! hold ends up on the list, grouped by lower-cased name.

use std::{collections::HashMap, sync::Arc};

use chrono::{Local, NaiveDate};

use crate::models::{
    grocery::{GroceryListItem, GroceryListUse, MealPlanIngredient},
    pantry::PantryItem,
};
use crate::repositories::{PantryRepository, RecipeRepository, RepositoryError};
use crate::services::pantry_service::{PantryService, PantryServiceError};

pub fn is_match(ingredient_name: &str, pantry_item_name: &str) -> bool {
    ingredient_name.to_lowercase() == pantry_item_name.to_lowercase()
}

/// Groups missing ingredients in first-seen order.
pub fn build_grocery_list(
    ingredients: Vec<MealPlanIngredient>,
    pantry_items: &[PantryItem],
) -> Vec<GroceryListItem> {
    let mut items: Vec<GroceryListItem> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    let missing = ingredients.into_iter().filter(|ingredient| {
        !pantry_items
            .iter()
            .any(|item| is_match(&ingredient.name, &item.name))
    });

    for ingredient in missing {
        let name = ingredient.name.to_lowercase();
        let grocery_use = GroceryListUse {
            id: ingredient.recipe_id,
            amount: ingredient.amount,
            recipe_name: ingredient.recipe_name,
            multiplier: ingredient.meal_plan_multiplier,
        };

        match positions.get(&name) {
            Some(&index) => {
                let item = &mut items[index];
                item.id = ingredient.id;
                item.uses.push(grocery_use);
            }
            None => {
                positions.insert(name.clone(), items.len());
                items.push(GroceryListItem {
                    id: ingredient.id,
                    name,
                    uses: vec![grocery_use],
                });
            }
        }
    }

    items
}

/// "Grocery Trip - October 19"
pub fn grocery_trip_shelf_name(date: NaiveDate) -> String {
    format!("Grocery Trip - {}", date.format("%B %-d"))
}

pub struct GroceryListService {
    recipes: Arc<dyn RecipeRepository>,
    pantry: Arc<dyn PantryRepository>,
    pantry_service: Arc<PantryService>,
}

impl GroceryListService {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        pantry: Arc<dyn PantryRepository>,
        pantry_service: Arc<PantryService>,
    ) -> Self {
        Self {
            recipes,
            pantry,
            pantry_service,
        }
    }

    pub async fn grocery_list(&self, user_id: i64) -> Result<Vec<GroceryListItem>, RepositoryError> {
        let ingredients = self.recipes.list_meal_plan_ingredients(user_id).await?;
        let pantry_items = self.pantry.list_items(user_id).await?;
        Ok(build_grocery_list(ingredients, &pantry_items))
    }

    pub async fn check_off_item(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<PantryItem, PantryServiceError> {
        self.check_off_item_on(user_id, name, Local::now().date_naive())
            .await
    }

    /// Moves `name` into the pantry, on the shelf of the day's grocery trip.
    pub async fn check_off_item_on(
        &self,
        user_id: i64,
        name: &str,
        date: NaiveDate,
    ) -> Result<PantryItem, PantryServiceError> {
        let shelf = self
            .pantry_service
            .find_or_create_shelf(user_id, &grocery_trip_shelf_name(date))
            .await?;
        let item = self.pantry_service.create_item(user_id, shelf.id, name).await?;
        tracing::debug!("User {} checked off {:?} onto shelf {}", user_id, name, shelf.id);
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{SqlitePantryRepository, SqliteRecipeRepository};
    use crate::test_utils::{create_test_db, insert_test_user};

    fn ingredient(id: i64, recipe_id: i64, name: &str, recipe_name: &str) -> MealPlanIngredient {
        MealPlanIngredient {
            id,
            recipe_id,
            name: name.to_string(),
            amount: Some("1".to_string()),
            recipe_name: recipe_name.to_string(),
            meal_plan_multiplier: 2,
        }
    }

    fn pantry_item(name: &str) -> PantryItem {
        PantryItem {
            id: 1,
            shelf_id: 1,
            user_id: 1,
            name: name.to_string(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_groups_case_insensitively_in_first_seen_order() {
        let list = build_grocery_list(
            vec![
                ingredient(1, 10, "Eggs", "Omelette"),
                ingredient(2, 10, "Butter", "Omelette"),
                ingredient(3, 11, "eggs", "Cake"),
            ],
            &[],
        );

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "eggs");
        assert_eq!(list[0].id, 3);
        let recipes: Vec<_> = list[0].uses.iter().map(|u| u.recipe_name.as_str()).collect();
        assert_eq!(recipes, ["Omelette", "Cake"]);
        assert_eq!(list[1].name, "butter");
    }

    #[test]
    fn test_skips_ingredients_in_pantry() {
        let list = build_grocery_list(
            vec![
                ingredient(1, 10, "Milk", "Pancakes"),
                ingredient(2, 10, "Flour", "Pancakes"),
            ],
            &[pantry_item("MILK")],
        );
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "flour");
        assert_eq!(list[0].uses[0].multiplier, 2);
        assert_eq!(list[0].uses[0].id, 10);
    }

    #[test]
    fn test_trip_shelf_name() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 9).unwrap();
        assert_eq!(grocery_trip_shelf_name(date), "Grocery Trip - October 9");
    }

    #[tokio::test]
    async fn test_check_off_reuses_the_days_shelf() {
        let pool = create_test_db().await.unwrap();
        let user_id = insert_test_user(&pool, "alice@example.com").await.unwrap();
        let pantry = Arc::new(SqlitePantryRepository::new(pool.clone()));
        let service = GroceryListService::new(
            Arc::new(SqliteRecipeRepository::new(pool)),
            pantry.clone(),
            Arc::new(PantryService::new(pantry.clone())),
        );
        let date = NaiveDate::from_ymd_opt(2024, 10, 19).unwrap();

        let milk = service.check_off_item_on(user_id, "milk", date).await.unwrap();
        let eggs = service.check_off_item_on(user_id, "eggs", date).await.unwrap();
        assert_eq!(milk.shelf_id, eggs.shelf_id);

        let shelf = pantry.find_shelf(milk.shelf_id).await.unwrap().unwrap();
        assert_eq!(shelf.name, "Grocery Trip - October 19");
        assert_eq!(pantry.list_shelves(user_id, None).await.unwrap().len(), 1);
    }
}
