use crate::models::user::User;
use crate::repositories::user_repository::{RepositoryError, UserRepository};
use crate::validation::is_valid_email;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("{0} is required")]
    MissingName(&'static str),
    #[error("User not found")]
    UserNotFound,
    #[error("Email already registered")]
    EmailTaken,
    #[error("Repository error: {0}")]
    RepositoryError(#[from] RepositoryError),
}

pub struct CreateUserRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Emails are compared case-insensitively and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService {
    repository: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, UserServiceError> {
        let email = normalize_email(&request.email);
        self.validate_email(&email)?;

        let first_name = request.first_name.trim();
        if first_name.is_empty() {
            return Err(UserServiceError::MissingName("firstName"));
        }
        let last_name = request.last_name.trim();
        if last_name.is_empty() {
            return Err(UserServiceError::MissingName("lastName"));
        }

        match self
            .repository
            .create_user(&email, first_name, last_name)
            .await
        {
            Ok(user) => {
                tracing::info!("Created user {}", user.id);
                Ok(user)
            }
            Err(RepositoryError::AlreadyExists) => Err(UserServiceError::EmailTaken),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, UserServiceError> {
        Ok(self
            .repository
            .find_by_email(&normalize_email(email))
            .await?)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    pub async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<User>, UserServiceError> {
        Ok(self.repository.list_users(limit, offset).await?)
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), UserServiceError> {
        match self.repository.delete_user(id).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(UserServiceError::UserNotFound),
            Err(e) => Err(UserServiceError::RepositoryError(e)),
        }
    }

    pub fn validate_email(&self, email: &str) -> Result<(), UserServiceError> {
        if !is_valid_email(email) {
            return Err(UserServiceError::InvalidEmail);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::user_repository::MockUserRepository;
    use mockall::predicate::*;

    fn user(email: &str) -> User {
        User {
            id: 1,
            email: email.to_string(),
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            created_at: "2024-01-01 00:00:00".to_string(),
            updated_at: "2024-01-01 00:00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let mut mock_repo = MockUserRepository::new();

        let created = user("alice@example.com");
        mock_repo
            .expect_create_user()
            .with(eq("alice@example.com"), eq("Alice"), eq("Smith"))
            .times(1)
            .returning(move |_, _, _| {
                let user = created.clone();
                Box::pin(async move { Ok(user) })
            });

        let service = UserService::new(Arc::new(mock_repo));

        let request = CreateUserRequest {
            email: "  Alice@Example.com ".to_string(),
            first_name: " Alice".to_string(),
            last_name: "Smith ".to_string(),
        };

        let user = service.create_user(request).await.expect("Expected Ok result");
        assert_eq!(user.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_create_user_requires_names() {
        let service = UserService::new(Arc::new(MockUserRepository::new()));

        let result = service
            .create_user(CreateUserRequest {
                email: "alice@example.com".to_string(),
                first_name: "  ".to_string(),
                last_name: "Smith".to_string(),
            })
            .await;
        assert!(matches!(result, Err(UserServiceError::MissingName("firstName"))));

        let result = service
            .create_user(CreateUserRequest {
                email: "alice@example.com".to_string(),
                first_name: "Alice".to_string(),
                last_name: String::new(),
            })
            .await;
        assert!(matches!(result, Err(UserServiceError::MissingName("lastName"))));
    }

    #[tokio::test]
    async fn test_create_user_invalid_email() {
        let service = UserService::new(Arc::new(MockUserRepository::new()));

        let result = service
            .create_user(CreateUserRequest {
                email: "invalid-email".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
            })
            .await;
        assert!(matches!(result, Err(UserServiceError::InvalidEmail)));
    }

    #[tokio::test]
    async fn test_duplicate_email_is_taken() {
        let mut mock_repo = MockUserRepository::new();
        mock_repo
            .expect_create_user()
            .returning(|_, _, _| Box::pin(async { Err(RepositoryError::AlreadyExists) }));

        let service = UserService::new(Arc::new(mock_repo));
        let result = service
            .create_user(CreateUserRequest {
                email: "alice@example.com".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Smith".to_string(),
            })
            .await;
        assert!(matches!(result, Err(UserServiceError::EmailTaken)));
    }

    #[tokio::test]
    async fn test_find_by_email_normalizes() {
        let mut mock_repo = MockUserRepository::new();
        let found = user("alice@example.com");
        mock_repo
            .expect_find_by_email()
            .with(eq("alice@example.com"))
            .returning(move |_| {
                let user = found.clone();
                Box::pin(async move { Ok(Some(user)) })
            });

        let service = UserService::new(Arc::new(mock_repo));
        let user = service.find_user_by_email(" ALICE@example.com").await.unwrap();
        assert_eq!(user.map(|u| u.id), Some(1));
    }
}
