use std::sync::Arc;

use crate::models::pantry::{
    PantryAction, PantryActionOutcome, PantryItem, PantryShelf, ShelfWithItems,
    DEFAULT_SHELF_NAME,
};
use crate::repositories::{PantryRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum PantryServiceError {
    /// The record exists but belongs to another user.
    #[error("{message}")]
    NotPermitted {
        field: &'static str,
        message: &'static str,
    },
    #[error("Shelf not found")]
    ShelfNotFound,
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct PantryService {
    repository: Arc<dyn PantryRepository>,
}

impl PantryService {
    pub fn new(repository: Arc<dyn PantryRepository>) -> Self {
        Self { repository }
    }

    pub async fn list_shelves(
        &self,
        user_id: i64,
        query: Option<&str>,
    ) -> Result<Vec<ShelfWithItems>, PantryServiceError> {
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        Ok(self.repository.list_shelves(user_id, query).await?)
    }

    pub async fn apply(
        &self,
        user_id: i64,
        action: PantryAction,
    ) -> Result<PantryActionOutcome, PantryServiceError> {
        match action {
            PantryAction::CreateShelf => {
                let shelf = self.repository.create_shelf(user_id, DEFAULT_SHELF_NAME).await?;
                Ok(PantryActionOutcome::Shelf(shelf))
            }
            PantryAction::DeleteShelf { shelf_id } => {
                // Deleting a shelf that is already gone is not an error.
                if let Some(shelf) = self.repository.find_shelf(shelf_id).await? {
                    ensure_owner(
                        shelf.user_id,
                        user_id,
                        "shelfId",
                        "You do not have permission to delete this shelf",
                    )?;
                }
                let deleted = self.repository.delete_shelf(shelf_id).await?;
                Ok(PantryActionOutcome::Deleted { deleted })
            }
            PantryAction::SaveShelfName {
                shelf_id,
                shelf_name,
            } => {
                self.owned_shelf(
                    user_id,
                    shelf_id,
                    "You do not have permission to change the shelf's name",
                )
                .await?;
                let shelf = self.repository.rename_shelf(shelf_id, &shelf_name).await?;
                Ok(PantryActionOutcome::Shelf(shelf))
            }
            PantryAction::CreateShelfItem {
                shelf_id,
                item_name,
            } => {
                let item = self.create_item(user_id, shelf_id, &item_name).await?;
                Ok(PantryActionOutcome::Item(item))
            }
            PantryAction::DeleteShelfItem { item_id } => {
                if let Some(item) = self.repository.find_item(item_id).await? {
                    ensure_owner(
                        item.user_id,
                        user_id,
                        "itemId",
                        "You do not have permission to delete this item",
                    )?;
                }
                let deleted = self.repository.delete_item(item_id).await?;
                Ok(PantryActionOutcome::Deleted { deleted })
            }
        }
    }

    pub async fn create_item(
        &self,
        user_id: i64,
        shelf_id: i64,
        name: &str,
    ) -> Result<PantryItem, PantryServiceError> {
        self.owned_shelf(
            user_id,
            shelf_id,
            "You do not have permission to add items to this shelf",
        )
        .await?;
        Ok(self.repository.create_item(user_id, shelf_id, name).await?)
    }

    /// Shelf of `user_id` named exactly `name`, created when missing.
    pub async fn find_or_create_shelf(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<PantryShelf, PantryServiceError> {
        if let Some(shelf) = self.repository.find_shelf_by_name(user_id, name).await? {
            return Ok(shelf);
        }
        tracing::debug!("Creating shelf {:?} for user {}", name, user_id);
        Ok(self.repository.create_shelf(user_id, name).await?)
    }

    async fn owned_shelf(
        &self,
        user_id: i64,
        shelf_id: i64,
        message: &'static str,
    ) -> Result<PantryShelf, PantryServiceError> {
        let shelf = self
            .repository
            .find_shelf(shelf_id)
            .await?
            .ok_or(PantryServiceError::ShelfNotFound)?;
        ensure_owner(shelf.user_id, user_id, "shelfId", message)?;
        Ok(shelf)
    }
}

fn ensure_owner(
    owner_id: i64,
    user_id: i64,
    field: &'static str,
    message: &'static str,
) -> Result<(), PantryServiceError> {
    if owner_id != user_id {
        tracing::warn!("User {} denied access to a record of user {}", user_id, owner_id);
        return Err(PantryServiceError::NotPermitted { field, message });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::SqlitePantryRepository;
    use crate::test_utils::{create_test_db, insert_test_user};

    async fn setup() -> (PantryService, i64, i64) {
        let pool = create_test_db().await.unwrap();
        let alice = insert_test_user(&pool, "alice@example.com").await.unwrap();
        let bob = insert_test_user(&pool, "bob@example.com").await.unwrap();
        let service = PantryService::new(Arc::new(SqlitePantryRepository::new(pool)));
        (service, alice, bob)
    }

    async fn new_shelf(service: &PantryService, user_id: i64) -> PantryShelf {
        match service.apply(user_id, PantryAction::CreateShelf).await.unwrap() {
            PantryActionOutcome::Shelf(shelf) => shelf,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_shelf_uses_default_name() {
        let (service, alice, _) = setup().await;
        let shelf = new_shelf(&service, alice).await;
        assert_eq!(shelf.name, "New Shelf");
        assert_eq!(shelf.user_id, alice);
    }

    #[tokio::test]
    async fn test_cannot_touch_other_users_shelf() {
        let (service, alice, bob) = setup().await;
        let shelf = new_shelf(&service, alice).await;

        let err = service
            .apply(bob, PantryAction::DeleteShelf { shelf_id: shelf.id })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PantryServiceError::NotPermitted {
                field: "shelfId",
                message: "You do not have permission to delete this shelf"
            }
        ));

        let err = service
            .apply(
                bob,
                PantryAction::SaveShelfName {
                    shelf_id: shelf.id,
                    shelf_name: "Mine now".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PantryServiceError::NotPermitted { .. }));

        let err = service
            .apply(
                bob,
                PantryAction::CreateShelfItem {
                    shelf_id: shelf.id,
                    item_name: "Milk".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PantryServiceError::NotPermitted { .. }));
    }

    #[tokio::test]
    async fn test_deleting_missing_records_is_not_an_error() {
        let (service, alice, _) = setup().await;
        let outcome = service
            .apply(alice, PantryAction::DeleteShelf { shelf_id: 999 })
            .await
            .unwrap();
        assert_eq!(outcome, PantryActionOutcome::Deleted { deleted: false });

        let outcome = service
            .apply(alice, PantryAction::DeleteShelfItem { item_id: 999 })
            .await
            .unwrap();
        assert_eq!(outcome, PantryActionOutcome::Deleted { deleted: false });
    }

    #[tokio::test]
    async fn test_item_ownership() {
        let (service, alice, bob) = setup().await;
        let shelf = new_shelf(&service, alice).await;
        let item = service.create_item(alice, shelf.id, "Milk").await.unwrap();

        let err = service
            .apply(bob, PantryAction::DeleteShelfItem { item_id: item.id })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PantryServiceError::NotPermitted { field: "itemId", .. }
        ));

        let outcome = service
            .apply(alice, PantryAction::DeleteShelfItem { item_id: item.id })
            .await
            .unwrap();
        assert_eq!(outcome, PantryActionOutcome::Deleted { deleted: true });
    }

    #[tokio::test]
    async fn test_find_or_create_shelf_is_idempotent() {
        let (service, alice, bob) = setup().await;
        let first = service.find_or_create_shelf(alice, "Trip").await.unwrap();
        let again = service.find_or_create_shelf(alice, "Trip").await.unwrap();
        assert_eq!(first.id, again.id);

        let other = service.find_or_create_shelf(bob, "Trip").await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_rename_missing_shelf() {
        let (service, alice, _) = setup().await;
        let err = service
            .apply(
                alice,
                PantryAction::SaveShelfName {
                    shelf_id: 404,
                    shelf_name: "x".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PantryServiceError::ShelfNotFound));
    }
}
