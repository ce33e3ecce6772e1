use async_trait::async_trait;
use sqlx::SqlitePool;

use super::{RepositoryError, RepositoryResult};
use crate::models::pantry::{PantryItem, PantryShelf, ShelfWithItems};

const SHELF_COLUMNS: &str = "id, user_id, name, created_at";
const ITEM_COLUMNS: &str = "id, shelf_id, user_id, name, created_at";

#[async_trait]
pub trait PantryRepository: Send + Sync {
    /// Shelves of `user_id`, newest first, optionally filtered by a
    /// case-insensitive substring of the shelf name.
    async fn list_shelves(
        &self,
        user_id: i64,
        query: Option<&str>,
    ) -> RepositoryResult<Vec<ShelfWithItems>>;
    async fn find_shelf(&self, id: i64) -> RepositoryResult<Option<PantryShelf>>;
    async fn find_shelf_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> RepositoryResult<Option<PantryShelf>>;
    async fn create_shelf(&self, user_id: i64, name: &str) -> RepositoryResult<PantryShelf>;
    async fn rename_shelf(&self, id: i64, name: &str) -> RepositoryResult<PantryShelf>;
    async fn delete_shelf(&self, id: i64) -> RepositoryResult<bool>;
    async fn find_item(&self, id: i64) -> RepositoryResult<Option<PantryItem>>;
    async fn create_item(
        &self,
        user_id: i64,
        shelf_id: i64,
        name: &str,
    ) -> RepositoryResult<PantryItem>;
    async fn delete_item(&self, id: i64) -> RepositoryResult<bool>;
    async fn list_items(&self, user_id: i64) -> RepositoryResult<Vec<PantryItem>>;
}

pub struct SqlitePantryRepository {
    pool: SqlitePool,
}

impl SqlitePantryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Escapes `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl PantryRepository for SqlitePantryRepository {
    async fn list_shelves(
        &self,
        user_id: i64,
        query: Option<&str>,
    ) -> RepositoryResult<Vec<ShelfWithItems>> {
        let pattern = like_pattern(query.unwrap_or_default());
        let shelves = sqlx::query_as::<_, PantryShelf>(&format!(
            "SELECT {} FROM pantry_shelves \
             WHERE user_id = ? AND name LIKE ? ESCAPE '\\' \
             ORDER BY created_at DESC, id DESC",
            SHELF_COLUMNS
        ))
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, PantryItem>(&format!(
            "SELECT {} FROM pantry_items WHERE user_id = ? ORDER BY name ASC, id ASC",
            ITEM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shelves
            .into_iter()
            .map(|shelf| {
                let items = items
                    .iter()
                    .filter(|item| item.shelf_id == shelf.id)
                    .cloned()
                    .collect();
                ShelfWithItems { shelf, items }
            })
            .collect())
    }

    async fn find_shelf(&self, id: i64) -> RepositoryResult<Option<PantryShelf>> {
        let shelf = sqlx::query_as::<_, PantryShelf>(&format!(
            "SELECT {} FROM pantry_shelves WHERE id = ?",
            SHELF_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(shelf)
    }

    async fn find_shelf_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> RepositoryResult<Option<PantryShelf>> {
        let shelf = sqlx::query_as::<_, PantryShelf>(&format!(
            "SELECT {} FROM pantry_shelves WHERE user_id = ? AND name = ? ORDER BY id LIMIT 1",
            SHELF_COLUMNS
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(shelf)
    }

    async fn create_shelf(&self, user_id: i64, name: &str) -> RepositoryResult<PantryShelf> {
        let id = sqlx::query("INSERT INTO pantry_shelves (user_id, name) VALUES (?, ?)")
            .bind(user_id)
            .bind(name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        self.find_shelf(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn rename_shelf(&self, id: i64, name: &str) -> RepositoryResult<PantryShelf> {
        let result = sqlx::query("UPDATE pantry_shelves SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.find_shelf(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete_shelf(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM pantry_shelves WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_item(&self, id: i64) -> RepositoryResult<Option<PantryItem>> {
        let item = sqlx::query_as::<_, PantryItem>(&format!(
            "SELECT {} FROM pantry_items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn create_item(
        &self,
        user_id: i64,
        shelf_id: i64,
        name: &str,
    ) -> RepositoryResult<PantryItem> {
        let id = sqlx::query("INSERT INTO pantry_items (user_id, shelf_id, name) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(shelf_id)
            .bind(name)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        self.find_item(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete_item(&self, id: i64) -> RepositoryResult<bool> {
        let result = sqlx::query("DELETE FROM pantry_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_items(&self, user_id: i64) -> RepositoryResult<Vec<PantryItem>> {
        let items = sqlx::query_as::<_, PantryItem>(&format!(
            "SELECT {} FROM pantry_items WHERE user_id = ? ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}
