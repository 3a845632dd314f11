use crate::error::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `config.toml`; omitted sections fall back to
/// their `Default` implementation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub pagination: PaginationSettings,
    pub logging: LoggingSettings,
}

/// Settings for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// The interface to bind to (e.g., "0.0.0.0").
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body size, in bytes.
    pub body_limit_bytes: usize,
}

/// Settings for the PostgreSQL connection pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// The connection string. When absent, `DATABASE_URL` from the environment is used.
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Upper bound for any single statement, including those inside an
    /// enrollment transaction. Enforced by PostgreSQL's `statement_timeout`.
    pub statement_timeout_ms: u64,
    /// Apply embedded migrations when the server starts.
    pub run_migrations: bool,
}

/// Defaults and bounds for paginated list endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub default_limit: u32,
    pub max_limit: u32,
}

/// Output format of the console log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Settings for the tracing subscriber.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive (e.g., "info" or "campus=debug,sqlx=warn").
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
    /// When set, logs are also written to a daily rolling file in this directory.
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
            acquire_timeout_secs: 5,
            statement_timeout_ms: 5_000,
            run_migrations: true,
        }
    }
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            directory: None,
            file_prefix: "campus.log".to_string(),
        }
    }
}

impl Config {
    /// Checks the loaded values for logical consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be greater than 0".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }
        if self.pagination.max_limit == 0 {
            return Err(ConfigError::ValidationError(
                "pagination.max_limit must be greater than 0".to_string(),
            ));
        }
        if self.pagination.default_limit == 0
            || self.pagination.default_limit > self.pagination.max_limit
        {
            return Err(ConfigError::ValidationError(format!(
                "pagination.default_limit must be between 1 and {}",
                self.pagination.max_limit
            )));
        }
        Ok(())
    }
}

impl ServerSettings {
    /// Resolves `host:port` into a socket address for the listener.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "server address '{}:{}' is invalid: {}",
                    self.host, self.port, e
                ))
            })
    }
}
