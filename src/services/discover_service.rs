use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::models::recipe::{RecipeSummary, RecipeWithIngredients};
use crate::repositories::{RecipeRepository, RepositoryError};

pub const DISCOVER_PAGE_SIZE: i64 = 25;

#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    #[error("Recipe not found")]
    NotFound,
    #[error("Failed to serialize recipe: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

/// Public recipe page with its validators.
#[derive(Debug, Clone)]
pub struct DiscoverPage {
    pub recipe: RecipeWithIngredients,
    /// Serialized recipe, the exact bytes the ETag covers.
    pub body: Vec<u8>,
    pub etag: String,
    pub page_etag: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Per-viewer ETag: the same recipe renders differently per viewer.
pub fn page_etag(viewer: Option<i64>, etag: &str) -> String {
    let viewer = viewer
        .map(|id| id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());
    format!("{}.{}", sha256_hex(viewer.as_bytes()), etag)
}

/// Whether an `If-None-Match` value matches `etag`. Accepts quoted, weak and
/// bare entity tags, comma separated, and `*`.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        candidate.trim_matches('"') == etag
    })
}

pub struct DiscoverService {
    repository: Arc<dyn RecipeRepository>,
}

impl DiscoverService {
    pub fn new(repository: Arc<dyn RecipeRepository>) -> Self {
        Self { repository }
    }

    pub async fn latest(&self) -> Result<Vec<RecipeSummary>, DiscoverError> {
        Ok(self.repository.list_recent(DISCOVER_PAGE_SIZE).await?)
    }

    pub async fn recipe_page(
        &self,
        recipe_id: i64,
        viewer: Option<i64>,
    ) -> Result<DiscoverPage, DiscoverError> {
        let recipe = self
            .repository
            .find_recipe(recipe_id)
            .await?
            .ok_or(DiscoverError::NotFound)?;
        let ingredients = self.repository.list_ingredients(recipe.id).await?;
        let recipe = RecipeWithIngredients {
            recipe,
            ingredients,
        };

        let body = serde_json::to_vec(&serde_json::json!({ "recipe": &recipe }))?;
        let etag = sha256_hex(&body);
        let page_etag = page_etag(viewer, &etag);

        Ok(DiscoverPage {
            recipe,
            body,
            etag,
            page_etag,
        })
    }
}
