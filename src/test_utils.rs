pub mod test_helpers {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{http::header::SET_COOKIE, response::IntoResponse};
    use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
    use tempfile::NamedTempFile;

    use crate::auth::session::SessionData;
    use crate::config::AppConfig;
    use crate::services::email_service::{EmailError, EmailService};
    use crate::AppState;

    pub const TEST_ORIGIN: &str = "http://localhost:8080";
    pub const TEST_MAGIC_LINK_SECRET: &str = "test-magic-link-secret";
    pub const TEST_COOKIE_SECRET: &str = "test-cookie-secret";

    /// Create a new in-memory SQLite database for testing
    pub async fn create_test_db() -> Result<SqlitePool, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(pool)
    }

    /// Create a temporary file-based SQLite database for testing
    /// Useful when several connections must see the same data
    pub async fn create_test_db_file() -> Result<(SqlitePool, NamedTempFile), sqlx::Error> {
        let temp_file = NamedTempFile::new().map_err(sqlx::Error::Io)?;
        let db_path = temp_file
            .path()
            .to_str()
            .ok_or_else(|| sqlx::Error::Configuration("Invalid database path".into()))?;
        let database_url = format!("sqlite://{}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok((pool, temp_file))
    }

    /// Insert a test user named Test User
    pub async fn insert_test_user(pool: &SqlitePool, email: &str) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (email, first_name, last_name) VALUES (?, ?, ?)")
                .bind(email)
                .bind("Test")
                .bind("User")
                .execute(pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Email service that keeps every magic link it was asked to send.
    #[derive(Default)]
    pub struct RecordingEmailService {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingEmailService {
        /// `(recipient, link)` pairs, oldest first.
        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
        }

        pub fn last_link(&self) -> Option<String> {
            self.sent().pop().map(|(_, link)| link)
        }
    }

    #[async_trait]
    impl EmailService for RecordingEmailService {
        async fn send_magic_link_email(&self, to_email: &str, link: &str) -> Result<(), EmailError> {
            if let Ok(mut sent) = self.sent.lock() {
                sent.push((to_email.to_string(), link.to_string()));
            }
            Ok(())
        }
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            environment: "test".to_string(),
            database_url: "sqlite::memory:".to_string(),
            origin: TEST_ORIGIN.to_string(),
            magic_link_secret: TEST_MAGIC_LINK_SECRET.to_string(),
            cookie_secrets: vec![TEST_COOKIE_SECRET.to_string()],
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }

    // Test-only helpers below panic on setup failure.

    /// App state over a fresh database, recording outgoing emails.
    pub async fn test_state() -> (AppState, Arc<RecordingEmailService>) {
        let pool = match create_test_db().await {
            Ok(pool) => pool,
            Err(e) => panic!("Failed to create test database: {}", e),
        };
        let emails = Arc::new(RecordingEmailService::default());
        match AppState::new(test_config(), pool, emails.clone()) {
            Ok(state) => (state, emails),
            Err(e) => panic!("Failed to build test state: {}", e),
        }
    }

    /// `Cookie` header value carrying `data` as a signed session.
    pub fn session_cookie(state: &AppState, data: &SessionData) -> String {
        let response = match state.sessions.commit(data) {
            Ok(jar) => jar.into_response(),
            Err(e) => panic!("Failed to encode session: {}", e),
        };
        match response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
        {
            Some(set_cookie) => cookie_pair(set_cookie),
            None => panic!("Session cookie was not set"),
        }
    }

    /// `name=value` part of a `Set-Cookie` header.
    pub fn cookie_pair(set_cookie: &str) -> String {
        set_cookie
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

// Re-export commonly used test functions at module level for convenience
pub use test_helpers::{
    cookie_pair, create_test_db, create_test_db_file, insert_test_user, session_cookie,
    test_config, test_state, RecordingEmailService,
};
