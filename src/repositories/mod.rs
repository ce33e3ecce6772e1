pub mod nonce_repository;
pub mod pantry_repository;
pub mod recipe_repository;
pub mod user_repository;

pub use nonce_repository::{ConsumedNonceRepository, SqliteConsumedNonceRepository};
pub use pantry_repository::{PantryRepository, SqlitePantryRepository};
pub use recipe_repository::{RecipeRepository, SqliteRecipeRepository};
pub use user_repository::{
    RepositoryError, RepositoryResult, SqliteUserRepository, UserRepository,
};
