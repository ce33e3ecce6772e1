use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::validation::{FieldErrors, FormFields, ACTION_FIELD};

pub const DEFAULT_SHELF_NAME: &str = "New Shelf";

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryShelf {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryItem {
    pub id: i64,
    pub shelf_id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfWithItems {
    #[serde(flatten)]
    pub shelf: PantryShelf,
    pub items: Vec<PantryItem>,
}

/// Mutations accepted by `POST /app/pantry`, selected by `_action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PantryAction {
    CreateShelf,
    DeleteShelf { shelf_id: i64 },
    SaveShelfName { shelf_id: i64, shelf_name: String },
    CreateShelfItem { shelf_id: i64, item_name: String },
    DeleteShelfItem { item_id: i64 },
}

impl PantryAction {
    pub fn from_form(fields: &FormFields) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        match fields.action() {
            Some("createShelf") => Ok(PantryAction::CreateShelf),
            Some("deleteShelf") => {
                let shelf_id = fields.id("shelfId", &mut errors);
                errors.finish(|| PantryAction::DeleteShelf {
                    shelf_id: shelf_id.unwrap_or_default(),
                })
            }
            Some("saveShelfName") => {
                let shelf_id = fields.id("shelfId", &mut errors);
                let shelf_name =
                    fields.required("shelfName", "Shelf name cannot be blank", &mut errors);
                errors.finish(|| PantryAction::SaveShelfName {
                    shelf_id: shelf_id.unwrap_or_default(),
                    shelf_name: shelf_name.unwrap_or_default(),
                })
            }
            Some("createShelfItem") => {
                let shelf_id = fields.id("shelfId", &mut errors);
                let item_name = fields.required("itemName", "Item name cannot be blank", &mut errors);
                errors.finish(|| PantryAction::CreateShelfItem {
                    shelf_id: shelf_id.unwrap_or_default(),
                    item_name: item_name.unwrap_or_default(),
                })
            }
            Some("deleteShelfItem") => {
                let item_id = fields.id("itemId", &mut errors);
                errors.finish(|| PantryAction::DeleteShelfItem {
                    item_id: item_id.unwrap_or_default(),
                })
            }
            _ => {
                errors.insert(ACTION_FIELD, "Unknown action");
                Err(errors)
            }
        }
    }
}

/// Response body of a pantry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PantryActionOutcome {
    Shelf(PantryShelf),
    Item(PantryItem),
    Deleted { deleted: bool },
}
