pub mod grocery;
pub mod magic_link;
pub mod pantry;
pub mod recipe;
pub mod user;

pub use grocery::{GroceryListAction, GroceryListItem, GroceryListUse, MealPlanIngredient};
pub use magic_link::MagicLinkPayload;
pub use pantry::{PantryAction, PantryActionOutcome, PantryItem, PantryShelf, ShelfWithItems};
pub use recipe::{
    Ingredient, IngredientUpdate, MealPlanAction, Recipe, RecipeAction, RecipeField,
    RecipeFilter, RecipeSummary, RecipeUpdate, RecipeWithIngredients, RecipesAction,
};
pub use user::{Profile, User};
