use crate::models::user::User;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Record already exists")]
    AlreadyExists,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

const USER_COLUMNS: &str = "id, email, first_name, last_name, created_at, updated_at";

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait UserRepository: Send + Sync {
    async fn create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<User>;
    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> RepositoryResult<()>;
    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>>;
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> RepositoryResult<User> {
        let result = sqlx::query("INSERT INTO users (email, first_name, last_name) VALUES (?, ?, ?)")
            .bind(email)
            .bind(first_name)
            .bind(last_name)
            .execute(&self.pool)
            .await;

        match result {
            Ok(res) => {
                let id = res.last_insert_rowid();
                self.find_by_id(id).await?.ok_or(RepositoryError::NotFound)
            }
            Err(e) => {
                if e.to_string().contains("UNIQUE") {
                    Err(RepositoryError::AlreadyExists)
                } else {
                    Err(RepositoryError::Database(e))
                }
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_users(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> RepositoryResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY id LIMIT ? OFFSET ?",
            USER_COLUMNS
        ))
        .bind(limit.unwrap_or(100))
        .bind(offset.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}
