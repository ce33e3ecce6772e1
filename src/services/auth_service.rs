//! Passwordless login: issuing magic links and completing them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::session::SessionData;
use crate::models::{magic_link::MagicLinkPayload, user::User};
use crate::repositories::{ConsumedNonceRepository, RepositoryError};
use crate::services::{
    email_service::{EmailError, EmailService},
    magic_link_service::{MagicLinkError, MagicLinkService},
    token_cipher::CipherError,
    user_service::{normalize_email, CreateUserRequest, UserService, UserServiceError},
};

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error(transparent)]
    MagicLink(#[from] MagicLinkError),
    #[error("User error: {0}")]
    User(#[from] UserServiceError),
    #[error("Email error: {0}")]
    Email(#[from] EmailError),
    #[error("Nonce store error: {0}")]
    NonceStore(RepositoryError),
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),
}

/// Result of opening a valid magic link.
#[derive(Debug)]
pub enum MagicLinkOutcome {
    /// The session now belongs to this user.
    Authenticated(User),
    /// No account exists for the link's email yet. The session nonce is kept
    /// so the signup form can complete the same link.
    SignupRequired(MagicLinkPayload),
}

pub struct AuthService {
    magic_links: Arc<MagicLinkService>,
    users: Arc<UserService>,
    nonces: Arc<dyn ConsumedNonceRepository>,
    email_service: Arc<dyn EmailService>,
}

impl AuthService {
    pub fn new(
        magic_links: Arc<MagicLinkService>,
        users: Arc<UserService>,
        nonces: Arc<dyn ConsumedNonceRepository>,
        email_service: Arc<dyn EmailService>,
    ) -> Self {
        Self {
            magic_links,
            users,
            nonces,
            email_service,
        }
    }

    pub fn magic_links(&self) -> &MagicLinkService {
        &self.magic_links
    }

    /// Binds a fresh nonce to `session` and emails a link carrying it.
    ///
    /// Returns the link. The caller commits the session.
    pub async fn request_magic_link(
        &self,
        email: &str,
        session: &mut SessionData,
    ) -> Result<String, AuthServiceError> {
        let email = normalize_email(email);
        self.users.validate_email(&email)?;

        let nonce = Uuid::new_v4().to_string();
        let link = self.magic_links.generate(&email, &nonce)?;
        session.nonce = Some(nonce);

        self.email_service.send_magic_link_email(&email, &link).await?;
        tracing::info!("Issued magic link for {}", email);
        Ok(link)
    }

    pub async fn complete_magic_link(
        &self,
        magic: Option<&str>,
        session: &mut SessionData,
    ) -> Result<MagicLinkOutcome, AuthServiceError> {
        self.complete_magic_link_at(magic, session, Utc::now()).await
    }

    pub async fn complete_magic_link_at(
        &self,
        magic: Option<&str>,
        session: &mut SessionData,
        now: DateTime<Utc>,
    ) -> Result<MagicLinkOutcome, AuthServiceError> {
        let payload = self
            .magic_links
            .verify_at(magic, session.nonce.as_deref(), now)?;

        match self.users.find_user_by_email(&payload.email).await? {
            Some(user) => {
                self.log_in(&user, &payload, session, now).await?;
                Ok(MagicLinkOutcome::Authenticated(user))
            }
            None => {
                tracing::info!("Magic link for unknown email {}, asking for signup", payload.email);
                Ok(MagicLinkOutcome::SignupRequired(payload))
            }
        }
    }

    pub async fn complete_signup(
        &self,
        magic: Option<&str>,
        session: &mut SessionData,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthServiceError> {
        self.complete_signup_at(magic, session, first_name, last_name, Utc::now())
            .await
    }

    /// Creates the account for a still-valid link and logs it in.
    ///
    /// An account created for the same email in the meantime is logged in
    /// instead: the link already proved ownership of the address.
    pub async fn complete_signup_at(
        &self,
        magic: Option<&str>,
        session: &mut SessionData,
        first_name: &str,
        last_name: &str,
        now: DateTime<Utc>,
    ) -> Result<User, AuthServiceError> {
        let payload = self
            .magic_links
            .verify_at(magic, session.nonce.as_deref(), now)?;

        let request = CreateUserRequest {
            email: payload.email.clone(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        let user = match self.users.create_user(request).await {
            Ok(user) => user,
            Err(UserServiceError::EmailTaken) => self
                .users
                .find_user_by_email(&payload.email)
                .await?
                .ok_or(UserServiceError::UserNotFound)?,
            Err(e) => return Err(e.into()),
        };

        self.log_in(&user, &payload, session, now).await?;
        Ok(user)
    }

    async fn log_in(
        &self,
        user: &User,
        payload: &MagicLinkPayload,
        session: &mut SessionData,
        now: DateTime<Utc>,
    ) -> Result<(), AuthServiceError> {
        let won = self
            .nonces
            .consume(&payload.nonce, now)
            .await
            .map_err(AuthServiceError::NonceStore)?;
        if !won {
            tracing::warn!("Magic link nonce was already consumed");
            return Err(MagicLinkError::NonceMismatch.into());
        }

        session.user_id = Some(user.id);
        session.nonce = None;
        session.csrf_token = None;

        let cutoff = now - self.magic_links.max_age();
        if let Err(e) = self.nonces.prune_before(cutoff).await {
            tracing::warn!("Failed to prune consumed nonces: {}", e);
        }

        tracing::info!("User {} logged in with a magic link", user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        nonce_repository::MockConsumedNonceRepository, SqliteConsumedNonceRepository,
        SqliteUserRepository,
    };
    use crate::services::token_cipher::TokenCipher;
    use crate::test_utils::{create_test_db, insert_test_user, RecordingEmailService};
    use chrono::Duration;

    fn magic_links() -> Arc<MagicLinkService> {
        Arc::new(MagicLinkService::new(
            TokenCipher::from_secret("unit-test-secret").unwrap(),
            "http://localhost:3000",
        ))
    }

    async fn service() -> (AuthService, Arc<RecordingEmailService>, sqlx::SqlitePool) {
        let pool = create_test_db().await.unwrap();
        let emails = Arc::new(RecordingEmailService::default());
        let service = AuthService::new(
            magic_links(),
            Arc::new(UserService::new(Arc::new(SqliteUserRepository::new(pool.clone())))),
            Arc::new(SqliteConsumedNonceRepository::new(pool.clone())),
            emails.clone(),
        );
        (service, emails, pool)
    }

    fn magic_param(link: &str) -> String {
        let encoded = link.split_once("?magic=").unwrap().1;
        urlencoding::decode(encoded).unwrap().into_owned()
    }

    #[tokio::test]
    async fn test_request_sets_nonce_and_sends_link() {
        let (service, emails, _pool) = service().await;
        let mut session = SessionData::default();

        let link = service
            .request_magic_link("Alice@Example.com", &mut session)
            .await
            .unwrap();

        assert!(session.nonce.is_some());
        let sent = emails.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "alice@example.com");
        assert_eq!(sent[0].1, link);
    }

    #[tokio::test]
    async fn test_request_rejects_invalid_email() {
        let (service, emails, _pool) = service().await;
        let mut session = SessionData::default();

        let result = service.request_magic_link("nope", &mut session).await;
        assert!(matches!(
            result,
            Err(AuthServiceError::User(UserServiceError::InvalidEmail))
        ));
        assert!(session.nonce.is_none());
        assert!(emails.sent().is_empty());
    }

    #[tokio::test]
    async fn test_existing_user_logs_in_once() {
        let (service, _emails, pool) = service().await;
        let user_id = insert_test_user(&pool, "alice@example.com").await.unwrap();
        let mut session = SessionData::default();

        let link = service
            .request_magic_link("alice@example.com", &mut session)
            .await
            .unwrap();
        let magic = magic_param(&link);

        let outcome = service
            .complete_magic_link(Some(&magic), &mut session)
            .await
            .unwrap();
        assert!(matches!(outcome, MagicLinkOutcome::Authenticated(ref u) if u.id == user_id));
        assert_eq!(session.user_id, Some(user_id));
        assert_eq!(session.nonce, None);

        let second = service.complete_magic_link(Some(&magic), &mut session).await;
        assert!(matches!(
            second,
            Err(AuthServiceError::MagicLink(MagicLinkError::NonceMismatch))
        ));
    }

    #[tokio::test]
    async fn test_replayed_session_cannot_consume_twice() {
        let (service, _emails, pool) = service().await;
        insert_test_user(&pool, "alice@example.com").await.unwrap();
        let mut session = SessionData::default();

        let link = service
            .request_magic_link("alice@example.com", &mut session)
            .await
            .unwrap();
        let magic = magic_param(&link);
        let mut replayed = session.clone();

        service
            .complete_magic_link(Some(&magic), &mut session)
            .await
            .unwrap();
        let result = service.complete_magic_link(Some(&magic), &mut replayed).await;
        assert!(matches!(
            result,
            Err(AuthServiceError::MagicLink(MagicLinkError::NonceMismatch))
        ));
        assert_eq!(replayed.user_id, None);
    }

    #[tokio::test]
    async fn test_unknown_user_needs_signup_then_logs_in() {
        let (service, _emails, _pool) = service().await;
        let mut session = SessionData::default();

        let link = service
            .request_magic_link("new@example.com", &mut session)
            .await
            .unwrap();
        let magic = magic_param(&link);

        let outcome = service
            .complete_magic_link(Some(&magic), &mut session)
            .await
            .unwrap();
        let MagicLinkOutcome::SignupRequired(payload) = outcome else {
            panic!("expected signup");
        };
        assert_eq!(payload.email, "new@example.com");
        assert!(session.nonce.is_some(), "nonce kept for the signup form");

        let user = service
            .complete_signup(Some(&magic), &mut session, "Alice", "Smith")
            .await
            .unwrap();
        assert_eq!(user.email, "new@example.com");
        assert_eq!(session.user_id, Some(user.id));
        assert_eq!(session.nonce, None);
    }

    #[tokio::test]
    async fn test_signup_for_existing_email_logs_that_user_in() {
        let (service, _emails, pool) = service().await;
        let mut session = SessionData::default();
        let link = service
            .request_magic_link("race@example.com", &mut session)
            .await
            .unwrap();
        let existing = insert_test_user(&pool, "race@example.com").await.unwrap();

        let user = service
            .complete_signup(Some(&magic_param(&link)), &mut session, "Someone", "Else")
            .await
            .unwrap();
        assert_eq!(user.id, existing);
        assert_eq!(session.user_id, Some(existing));
    }

    #[tokio::test]
    async fn test_expired_link_keeps_session_untouched() {
        let (service, _emails, pool) = service().await;
        insert_test_user(&pool, "alice@example.com").await.unwrap();
        let mut session = SessionData::default();
        let link = service
            .request_magic_link("alice@example.com", &mut session)
            .await
            .unwrap();

        let later = Utc::now() + Duration::minutes(11);
        let before = session.clone();
        let result = service
            .complete_magic_link_at(Some(&magic_param(&link)), &mut session, later)
            .await;
        assert!(matches!(
            result,
            Err(AuthServiceError::MagicLink(MagicLinkError::ExpiredToken))
        ));
        assert_eq!(session, before);
    }

    #[tokio::test]
    async fn test_lost_consume_race_is_nonce_mismatch() {
        let pool = create_test_db().await.unwrap();
        insert_test_user(&pool, "alice@example.com").await.unwrap();

        let mut nonces = MockConsumedNonceRepository::new();
        nonces
            .expect_consume()
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(false) }));
        nonces.expect_prune_before().never();

        let links = magic_links();
        let service = AuthService::new(
            links.clone(),
            Arc::new(UserService::new(Arc::new(SqliteUserRepository::new(pool)))),
            Arc::new(nonces),
            Arc::new(RecordingEmailService::default()),
        );

        let mut session = SessionData {
            nonce: Some("n-1".to_string()),
            ..Default::default()
        };
        let link = links.generate("alice@example.com", "n-1").unwrap();
        let result = service
            .complete_magic_link(Some(&magic_param(&link)), &mut session)
            .await;

        assert!(matches!(
            result,
            Err(AuthServiceError::MagicLink(MagicLinkError::NonceMismatch))
        ));
        assert_eq!(session.user_id, None);
        assert_eq!(session.nonce.as_deref(), Some("n-1"));
    }
}
