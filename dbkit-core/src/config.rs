//! Pool configuration sourced from the environment.
//!
//! Environment variables:
//!   mysql_hostname   # default: localhost
//!   mysql_username   # default: root
//!   mysql_password   # encrypted credential blob (JSON); default: shipped blob
//!   mysql_database   # default: sampledb
//!   APP_ENV          # "production" silences statement debugging by default

use std::fmt;
use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::secret::{decrypt, EncryptedSecret, SecretKey};

/// Credential shipped for local development; decrypts with the default key
pub const DEFAULT_PASSWORD_BLOB: &str = r#"{"encrypted":"f9b7f2c51d9629a933c3b6a5","tag":{"type":"Buffer","data":[30,192,255,200,106,122,190,182,176,136,2,6,167,122,152,61]},"iv":{"type":"Buffer","data":[101,2,130,98,15,176,120,20,155,36,79,243,234,169,112,98,55,131,137,134,111,1,210,196,129,240,103,164,108,230,9,22]}}"#;

const DEFAULT_PORT: u16 = 3306;
const DEFAULT_CONNECTION_LIMIT: u32 = 10;

/// Acquire timeout standing in for "do not wait for a free connection"
const NO_WAIT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(1);

/// Load `.env` from the current directory, if there is one.
///
/// Variables already present in the environment are never overwritten.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => info!("Loaded configuration from {}", path.display()),
        Err(e) if e.not_found() => debug!("No .env file found, using environment only"),
        Err(e) => warn!("Failed to read .env: {}", e),
    }
}

/// Connection pool settings with the password still encrypted
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Encrypted credential blob (JSON)
    pub password: String,
    pub database: String,
    /// When false, acquiring a connection fails immediately if none is free
    pub wait_for_connections: bool,
    pub connection_limit: u32,
    /// Maximum queued acquirers; 0 means unlimited
    pub queue_limit: u32,
    /// Deployment environment name (`APP_ENV`)
    pub environment: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            user: "root".to_string(),
            password: DEFAULT_PASSWORD_BLOB.to_string(),
            database: "sampledb".to_string(),
            wait_for_connections: true,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            queue_limit: 0,
            environment: "development".to_string(),
        }
    }
}

impl PoolConfig {
    /// Read the `mysql_*` variables, falling back to defaults for anything unset
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`PoolConfig::from_env`] with an injectable variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("mysql_hostname").unwrap_or(defaults.host),
            user: lookup("mysql_username").unwrap_or(defaults.user),
            password: lookup("mysql_password").unwrap_or(defaults.password),
            database: lookup("mysql_database").unwrap_or(defaults.database),
            environment: lookup("APP_ENV")
                .map(|env| env.trim().to_lowercase())
                .unwrap_or(defaults.environment),
            ..defaults
        }
    }

    /// Statement debugging is off by default in production
    pub fn silent_by_default(&self) -> bool {
        self.environment == "production"
    }

    /// Decrypt the password. Fails rather than falling back to an empty one.
    pub fn resolve(&self, key: &SecretKey) -> Result<ResolvedPoolConfig, ConfigError> {
        if self.connection_limit == 0 {
            return Err(ConfigError::invalid("connection_limit", "must be at least 1"));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        let blob = EncryptedSecret::from_json(&self.password)?;
        let password = decrypt(&blob, key)?;
        Ok(ResolvedPoolConfig {
            config: self.clone(),
            password,
        })
    }
}

/// Pool settings with the plaintext password; `Debug` redacts it
#[derive(Clone)]
pub struct ResolvedPoolConfig {
    config: PoolConfig,
    password: String,
}

impl ResolvedPoolConfig {
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.password)
            .database(&self.config.database)
    }

    pub fn pool_options(&self) -> MySqlPoolOptions {
        if self.config.queue_limit > 0 {
            warn!(
                queue_limit = self.config.queue_limit,
                "queue_limit is not enforced by the pool; acquirers queue without bound"
            );
        }
        let options = MySqlPoolOptions::new().max_connections(self.config.connection_limit);
        if self.config.wait_for_connections {
            options
        } else {
            options.acquire_timeout(NO_WAIT_ACQUIRE_TIMEOUT)
        }
    }
}

impl fmt::Debug for ResolvedPoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedPoolConfig")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("user", &self.config.user)
            .field("password", &"<redacted>")
            .field("database", &self.config.database)
            .field("connection_limit", &self.config.connection_limit)
            .finish()
    }
}
