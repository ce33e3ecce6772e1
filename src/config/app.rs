use std::env;

/// Errors raised while reading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("insecure production configuration: {0}")]
    Insecure(String),
}

/// Process-wide configuration, read once from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub environment: String,
    pub database_url: String,
    /// Public origin used to build magic links, without a trailing slash.
    pub origin: String,
    pub magic_link_secret: String,
    /// Cookie signing secrets, newest first.
    pub cookie_secrets: Vec<String>,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("environment", &self.environment)
            .field("database_url", &self.database_url)
            .field("origin", &self.origin)
            .field("magic_link_secret", &"[REDACTED]")
            .field("cookie_secrets", &format!("[{} REDACTED]", self.cookie_secrets.len()))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = current_environment();
        let database_url = required("DATABASE_URL")?;
        let origin = parse_origin(&required("ORIGIN")?)?;
        let magic_link_secret = required("MAGIC_LINK_SECRET")?;
        let cookie_secrets = parse_cookie_secrets(&required("AUTH_COOKIE_SECRETS")?)?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid {
                key: "PORT",
                reason: e.to_string(),
            })?;

        let config = Self {
            environment,
            database_url,
            origin,
            magic_link_secret,
            cookie_secrets,
            host,
            port,
        };
        config.validate_production()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Rejects settings that are fine on a laptop but not on the internet.
    pub fn validate_production(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }

        if !self.origin.starts_with("https://") {
            return Err(ConfigError::Insecure(
                "ORIGIN must use https in production".to_string(),
            ));
        }

        if self.magic_link_secret.len() < 32 {
            return Err(ConfigError::Insecure(
                "MAGIC_LINK_SECRET must be at least 32 characters in production".to_string(),
            ));
        }

        for secret in self
            .cookie_secrets
            .iter()
            .chain(std::iter::once(&self.magic_link_secret))
        {
            if looks_like_default(secret) {
                return Err(ConfigError::Insecure(
                    "a secret appears to be a default value. Generate one with `cli secret generate`"
                        .to_string(),
                ));
            }
        }

        if self.cookie_secrets.iter().any(|secret| secret.len() < 32) {
            return Err(ConfigError::Insecure(
                "AUTH_COOKIE_SECRETS entries must be at least 32 characters in production"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

pub fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(key)),
    }
}

pub fn parse_origin(raw: &str) -> Result<String, ConfigError> {
    let origin = raw.trim().trim_end_matches('/');
    if !(origin.starts_with("http://") || origin.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key: "ORIGIN",
            reason: "must start with http:// or https://".to_string(),
        });
    }
    Ok(origin.to_string())
}

pub fn parse_cookie_secrets(raw: &str) -> Result<Vec<String>, ConfigError> {
    let secrets: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if secrets.is_empty() {
        return Err(ConfigError::Missing("AUTH_COOKIE_SECRETS"));
    }
    Ok(secrets)
}

fn looks_like_default(secret: &str) -> bool {
    let lowered = secret.to_ascii_lowercase();
    lowered.contains("example") || lowered.contains("changeme") || lowered.contains("default")
}
