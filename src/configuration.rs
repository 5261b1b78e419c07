use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use crate::error::ConfigError;

/// Shortest signing secret accepted in production.
const MIN_SECRET_LENGTH: usize = 32;
const DEV_SECRET_LENGTH: usize = 64;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server-level connection, used to create throwaway test databases.
    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    /// HMAC signing secret. Optional only in the local environment.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds
}

impl JwtSettings {
    /// Resolve the signing secret for the given environment.
    ///
    /// Production refuses to start without a sufficiently long secret. Local
    /// runs fall back to a random per-process key, so tokens do not survive a
    /// restart.
    pub fn signing_secret(&self, environment: Environment) -> Result<String, ConfigError> {
        let configured = self
            .secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match (configured, environment) {
            (Some(secret), Environment::Production) if secret.len() < MIN_SECRET_LENGTH => {
                Err(ConfigError::InvalidValue(format!(
                    "jwt.secret must be at least {} bytes in production",
                    MIN_SECRET_LENGTH
                )))
            }
            (Some(secret), _) => Ok(secret.to_string()),
            (None, Environment::Production) => Err(ConfigError::MissingRequired(
                "jwt.secret (set APP_JWT__SECRET)".to_string(),
            )),
            (None, Environment::Local) => {
                tracing::warn!(
                    "No JWT signing secret configured; using a random development key. \
                     Never run like this in production"
                );
                Ok(thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(DEV_SECRET_LENGTH)
                    .map(char::from)
                    .collect())
            }
        }
    }
}

/// Deployment environment, read from `APP_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" | "development" | "dev" => Ok(Self::Local),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue(format!(
                "{} is not a supported environment. Use either `local` or `production`",
                other
            ))),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_access_token_expiry() -> i64 {
    15 * 60
}

fn default_refresh_token_expiry() -> i64 {
    30 * 24 * 60 * 60
}

pub fn get_environment() -> Result<Environment, ConfigError> {
    std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".to_string())
        .try_into()
}

/// Load settings from `configuration.yaml` (optional), overridden by
/// `APP_`-prefixed environment variables, e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    Ok(settings.try_deserialize::<Settings>()?)
}
