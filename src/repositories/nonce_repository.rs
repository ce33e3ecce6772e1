use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use super::RepositoryResult;

/// Record of magic-link nonces that already completed a login.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ConsumedNonceRepository: Send + Sync {
    /// Marks `nonce` as used. Returns `false` when it was already used.
    async fn consume(&self, nonce: &str, at: DateTime<Utc>) -> RepositoryResult<bool>;
    /// Deletes records consumed before `cutoff`.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64>;
}

pub struct SqliteConsumedNonceRepository {
    pool: SqlitePool,
}

impl SqliteConsumedNonceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl ConsumedNonceRepository for SqliteConsumedNonceRepository {
    async fn consume(&self, nonce: &str, at: DateTime<Utc>) -> RepositoryResult<bool> {
        let result = sqlx::query(
            "INSERT INTO consumed_magic_link_nonces (nonce, consumed_at) VALUES (?, ?) \
             ON CONFLICT(nonce) DO NOTHING",
        )
        .bind(nonce)
        .bind(timestamp(at))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = sqlx::query("DELETE FROM consumed_magic_link_nonces WHERE consumed_at < ?")
            .bind(timestamp(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_db;
    use chrono::Duration;

    #[tokio::test]
    async fn test_nonce_is_consumed_once() {
        let pool = create_test_db().await.unwrap();
        let repo = SqliteConsumedNonceRepository::new(pool);
        let now = Utc::now();

        assert!(repo.consume("n-1", now).await.unwrap());
        assert!(!repo.consume("n-1", now).await.unwrap());
        assert!(repo.consume("n-2", now).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_consumers_have_one_winner() {
        let pool = create_test_db().await.unwrap();
        let repo = std::sync::Arc::new(SqliteConsumedNonceRepository::new(pool));
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.consume("shared", now).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_prune_removes_only_old_rows() {
        let pool = create_test_db().await.unwrap();
        let repo = SqliteConsumedNonceRepository::new(pool);
        let now = Utc::now();

        repo.consume("old", now - Duration::minutes(30)).await.unwrap();
        repo.consume("fresh", now).await.unwrap();

        let removed = repo.prune_before(now - Duration::minutes(10)).await.unwrap();
        assert_eq!(removed, 1);
        assert!(repo.consume("old", now).await.unwrap());
        assert!(!repo.consume("fresh", now).await.unwrap());
    }
}
