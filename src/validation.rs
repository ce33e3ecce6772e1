//! Form parsing and field-level validation.
//!
//! Forms are read into [`FormFields`], which keeps every value submitted for a
//! name. Fields submitted as `name[]` are addressed by `name`, so repeated
//! inputs such as `ingredientNames[]` come back as an ordered list. Request
//! contracts (`PantryAction`, `RecipeAction`, ...) are built from these
//! fields and report problems as [`FieldErrors`], keyed by field path.

use std::collections::{BTreeMap, HashMap};

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::AppError;

pub const ACTION_FIELD: &str = "_action";

// Constant pattern, always compiles
#[allow(clippy::expect_used)]
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 255 && EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the first error reported for `field`.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FormFields {
    values: HashMap<String, Vec<String>>,
}

impl FormFields {
    pub fn parse(body: &[u8]) -> Self {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in form_urlencoded::parse(body) {
            let name = name.strip_suffix("[]").unwrap_or(name.as_ref()).to_string();
            values.entry(name).or_default().push(value.into_owned());
        }
        Self { values }
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        Self::parse(body.as_bytes())
    }

    /// First value submitted for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value submitted for `name` (or `name[]`), in submission order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn action(&self) -> Option<&str> {
        self.get(ACTION_FIELD)
    }

    /// Trimmed, non-blank value of `name`, or an error under `name`.
    pub fn required(&self, name: &str, message: &str, errors: &mut FieldErrors) -> Option<String> {
        match self.get(name).map(str::trim) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => {
                errors.insert(name, message);
                None
            }
        }
    }

    /// Trimmed value of `name`; blank counts as absent.
    pub fn optional(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
    }

    /// Record id submitted as `name`.
    pub fn id(&self, name: &str, errors: &mut FieldErrors) -> Option<i64> {
        match self.get(name).map(str::trim) {
            None | Some("") => {
                errors.insert(name, "Required");
                None
            }
            Some(raw) => parse_id(raw).or_else(|| {
                errors.insert(name, "Invalid id");
                None
            }),
        }
    }
}

pub fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!("Failed to read form body: {}", e);
            AppError::field(ACTION_FIELD, "Could not read form data")
        })?;
        Ok(FormFields::parse(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_fields_keep_every_value_in_order() {
        let fields = FormFields::parse(
            b"ingredientNames%5B%5D=Milk&ingredientNames%5B%5D=Eggs&name=Pancakes",
        );
        assert_eq!(fields.get_all("ingredientNames"), ["Milk", "Eggs"]);
        assert_eq!(fields.get("name"), Some("Pancakes"));
        assert!(fields.get_all("missing").is_empty());
    }

    #[test]
    fn test_plain_fields_return_first_value() {
        let fields = FormFields::parse(b"fruit=orange&fruit=apple");
        assert_eq!(fields.get("fruit"), Some("orange"));
    }

    #[test]
    fn test_required_rejects_blank_values() {
        let fields = FormFields::from_pairs([("shelfName", "   ")]);
        let mut errors = FieldErrors::new();
        assert_eq!(
            fields.required("shelfName", "Shelf name cannot be blank", &mut errors),
            None
        );
        assert_eq!(errors.get("shelfName"), Some("Shelf name cannot be blank"));
    }

    #[test]
    fn test_id_parsing() {
        let fields = FormFields::from_pairs([("shelfId", "12"), ("itemId", "abc")]);
        let mut errors = FieldErrors::new();
        assert_eq!(fields.id("shelfId", &mut errors), Some(12));
        assert_eq!(fields.id("itemId", &mut errors), None);
        assert_eq!(fields.id("recipeId", &mut errors), None);
        assert_eq!(errors.get("itemId"), Some("Invalid id"));
        assert_eq!(errors.get("recipeId"), Some("Required"));
    }

    #[test]
    fn test_first_error_wins() {
        let mut errors = FieldErrors::new();
        errors.insert("name", "first");
        errors.insert("name", "second");
        assert_eq!(errors.get("name"), Some("first"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("alice+pantry@mail.example.org"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("al ice@example.com"));
        assert!(!is_valid_email(""));
    }
}
