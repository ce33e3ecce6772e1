pub mod app_handlers;
pub mod auth_handlers;
pub mod discover_handlers;
pub mod grocery_list_handlers;
pub mod pantry_handlers;
pub mod recipe_handlers;
pub mod settings_handlers;

pub use app_handlers::app_home;
pub use auth_handlers::{
    complete_signup, index, login_handler, login_page, logout_handler, validate_magic_link,
};
pub use discover_handlers::{discover, discover_recipe};
pub use grocery_list_handlers::{grocery_list, grocery_list_action};
pub use pantry_handlers::{list_pantry, pantry_action};
pub use recipe_handlers::{list_recipes, recipe_action, recipes_action, show_recipe, update_meal_plan};
pub use settings_handlers::{app_settings, profile_settings, update_app_settings};
