use std::{collections::HashMap, env};

use pantry::{
    config::{AppConfig, ConfigError},
    db,
    services::{create_email_service, EmailError},
    test_utils::test_helpers,
    AppState,
};
use serial_test::serial;

#[derive(Default)]
struct EnvGuard {
    original: HashMap<String, Option<String>>,
}

impl EnvGuard {
    fn set(&mut self, key: &str, value: impl Into<String>) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::set_var(key, value.into());
    }

    fn remove(&mut self, key: &str) {
        self.original
            .entry(key.to_string())
            .or_insert_with(|| env::var(key).ok());
        env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.original.drain() {
            match value {
                Some(v) => env::set_var(&key, v),
                None => env::remove_var(&key),
            }
        }
    }
}

fn development_env(guard: &mut EnvGuard) {
    guard.set("ENVIRONMENT", "development");
    guard.set("DATABASE_URL", "sqlite::memory:");
    guard.set("ORIGIN", "http://localhost:8080/");
    guard.set("MAGIC_LINK_SECRET", "dev-magic-secret");
    guard.set("AUTH_COOKIE_SECRETS", "newest-secret, previous-secret");
    guard.remove("HOST");
    guard.remove("PORT");
    guard.remove("SMTP_HOST");
}

#[test]
#[serial]
fn test_reads_development_config() {
    let mut guard = EnvGuard::default();
    development_env(&mut guard);

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.origin, "http://localhost:8080");
    assert_eq!(config.cookie_secrets, vec!["newest-secret", "previous-secret"]);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 8080);
    assert!(!config.is_production());
}

#[test]
#[serial]
fn test_missing_magic_link_secret_fails_fast() {
    let mut guard = EnvGuard::default();
    development_env(&mut guard);
    guard.remove("MAGIC_LINK_SECRET");

    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::Missing("MAGIC_LINK_SECRET"))
    ));
}

#[test]
#[serial]
fn test_origin_must_have_scheme() {
    let mut guard = EnvGuard::default();
    development_env(&mut guard);
    guard.set("ORIGIN", "pantry.test");

    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::Invalid { key: "ORIGIN", .. })
    ));
}

#[test]
#[serial]
fn test_production_rejects_weak_secrets() {
    let mut guard = EnvGuard::default();
    development_env(&mut guard);
    guard.set("ENVIRONMENT", "production");
    guard.set("ORIGIN", "https://pantry.test");
    guard.set("MAGIC_LINK_SECRET", "m".repeat(48));
    guard.set("AUTH_COOKIE_SECRETS", "short");

    assert!(matches!(
        AppConfig::from_env(),
        Err(ConfigError::Insecure(_))
    ));

    guard.set("AUTH_COOKIE_SECRETS", "c".repeat(64));
    assert!(AppConfig::from_env().unwrap().is_production());
}

#[tokio::test]
#[serial]
async fn test_state_builds_from_environment() {
    let mut guard = EnvGuard::default();
    development_env(&mut guard);

    let config = AppConfig::from_env().unwrap();
    let pool = db::create_pool(&config.database_url).await.unwrap();
    db::run_migrations(&pool).await.unwrap();
    let email_service = create_email_service(config.is_production());

    let state = AppState::new(config, pool, email_service).unwrap();
    assert_eq!(state.sessions.cookie_name(), "pantry__session");
}

#[tokio::test]
#[serial]
async fn test_development_logs_magic_links_even_with_smtp_configured() {
    let mut guard = EnvGuard::default();
    guard.set("SMTP_HOST", "127.0.0.1");
    guard.set("SMTP_PORT", "1");
    guard.set("SMTP_USERNAME", "user");
    guard.set("SMTP_PASSWORD", "password");
    guard.set("SMTP_FROM_EMAIL", "noreply@pantry.test");
    guard.set("SMTP_ENCRYPTION", "none");

    // Nothing listens on port 1, so only the logging mailer can succeed
    let email_service = create_email_service(false);
    let result = email_service
        .send_magic_link_email(
            "alice@example.com",
            "http://localhost:8080/validate-magic-link?magic=abc",
        )
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
#[serial]
async fn test_production_uses_smtp_when_configured() {
    let mut guard = EnvGuard::default();
    guard.set("SMTP_HOST", "127.0.0.1");
    guard.set("SMTP_PORT", "1");
    guard.set("SMTP_USERNAME", "user");
    guard.set("SMTP_PASSWORD", "password");
    guard.set("SMTP_FROM_EMAIL", "noreply@pantry.test");
    guard.set("SMTP_ENCRYPTION", "none");

    let email_service = create_email_service(true);
    let result = email_service
        .send_magic_link_email(
            "alice@example.com",
            "https://pantry.test/validate-magic-link?magic=abc",
        )
        .await;
    assert!(matches!(result, Err(EmailError::SendFailed(_))));
}

#[tokio::test]
async fn test_file_database_runs_migrations() {
    let (pool, _file) = test_helpers::create_test_db_file().await.unwrap();
    let user_id = test_helpers::insert_test_user(&pool, "alice@example.com")
        .await
        .unwrap();
    assert!(user_id > 0);
}
