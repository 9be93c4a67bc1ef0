//! # Configuration Settings
//!
//! Defines the configuration structure for the School API.

use crate::errors::{Result, SchoolApiError};
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Logging and metrics configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Token issuance and password policy configuration
    #[validate(nested)]
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(SchoolApiError::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Rules the validator derive cannot express
    fn validate_custom(&self) -> Result<()> {
        if self.observability.enable_metrics && self.server.port == self.observability.metrics_port {
            return Err(SchoolApiError::validation(
                "Server and metrics ports cannot be the same",
            ));
        }

        if !self.database.is_sqlite() {
            return Err(SchoolApiError::validation(
                "Database URL must start with 'sqlite://' or 'sqlite:'",
            ));
        }

        if self.auth.jwt_secret.len() < 32 {
            return Err(SchoolApiError::validation(
                "JWT secret must be at least 32 characters long",
            ));
        }

        self.auth.algorithm()?;

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,

    /// Enable CORS
    pub enable_cors: bool,

    /// CORS allowed origins (empty = allow all)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
            cors_origins: vec![],
        }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(
        min = 1,
        max = 100,
        message = "Max connections must be between 1 and 100"
    ))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Run pending migrations when the pool is created
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/school.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600,
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// In-memory configuration used by tests and throwaway runs
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite://:memory:".to_string(),
            max_connections: 5,
            min_connections: 1,
            idle_timeout_seconds: 0,
            ..Default::default()
        }
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name attached to log output
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Emit JSON structured logs instead of the human readable format
    pub json_logging: bool,

    /// Expose a Prometheus scrape endpoint
    pub enable_metrics: bool,

    /// Prometheus listener port
    #[validate(range(min = 1, max = 65535, message = "Metrics port must be between 1 and 65535"))]
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "school-api".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
            enable_metrics: false,
            metrics_port: 9090,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if metrics are disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.enable_metrics {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        } else {
            None
        }
    }
}

/// Token issuance and password policy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret used to sign and verify tokens
    #[validate(length(min = 1, message = "JWT secret cannot be empty"))]
    pub jwt_secret: String,

    /// Signing algorithm (HS256, HS384 or HS512)
    pub jwt_algorithm: String,

    /// Token issuer claim
    #[validate(length(min = 1, message = "JWT issuer cannot be empty"))]
    pub jwt_issuer: String,

    /// Token audience claim
    #[validate(length(min = 1, message = "JWT audience cannot be empty"))]
    pub jwt_audience: String,

    /// Token lifetime in minutes
    #[validate(range(
        min = 1,
        max = 1440,
        message = "Token expiry must be between 1 minute and 24 hours"
    ))]
    pub token_expiry_minutes: u64,

    /// Minimum password length enforced at registration
    #[validate(range(min = 1, max = 128, message = "Password length must be between 1 and 128"))]
    pub password_min_length: usize,
}

/// Built-in signing secret; anyone reading the source can forge tokens with it
pub const DEFAULT_JWT_SECRET: &str = "school-api-default-secret-please-change-in-production";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_algorithm: "HS256".to_string(),
            jwt_issuer: "SchoolAPI".to_string(),
            jwt_audience: "https://localhost:5001".to_string(),
            token_expiry_minutes: 60,
            password_min_length: 6,
        }
    }
}

impl AuthConfig {
    /// Whether tokens are still signed with [`DEFAULT_JWT_SECRET`]
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Get token expiry as Duration
    pub fn token_expiry(&self) -> Duration {
        Duration::from_secs(self.token_expiry_minutes * 60)
    }

    /// Parse the configured signing algorithm; only HMAC algorithms are accepted
    pub fn algorithm(&self) -> Result<Algorithm> {
        let algorithm = Algorithm::from_str(&self.jwt_algorithm.to_uppercase()).map_err(|_| {
            SchoolApiError::validation_field(
                format!("Unsupported JWT algorithm '{}'", self.jwt_algorithm),
                "jwt_algorithm",
            )
        })?;

        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
            other => Err(SchoolApiError::validation_field(
                format!("JWT algorithm {:?} requires key material; use HS256, HS384 or HS512", other),
                "jwt_algorithm",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_secret_is_detected() {
        let mut auth = AuthConfig::default();
        assert!(auth.uses_default_secret());

        auth.jwt_secret = "a-deployment-specific-secret-of-32-bytes!".to_string();
        assert!(!auth.uses_default_secret());
    }

    #[test]
    fn test_server_config_bind_address() {
        let config = ServerConfig { host: "0.0.0.0".to_string(), port: 8080, ..Default::default() };
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_database_config_timeouts() {
        let config = DatabaseConfig {
            connect_timeout_seconds: 15,
            idle_timeout_seconds: 300,
            ..Default::default()
        };
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(300)));

        let config_no_idle = DatabaseConfig { idle_timeout_seconds: 0, ..Default::default() };
        assert_eq!(config_no_idle.idle_timeout(), None);
    }

    #[test]
    fn test_database_config_type_detection() {
        assert!(DatabaseConfig::in_memory().is_sqlite());
        let pg_config =
            DatabaseConfig { url: "postgresql://localhost/test".to_string(), ..Default::default() };
        assert!(!pg_config.is_sqlite());
    }

    #[test]
    fn test_metrics_address() {
        let config = ObservabilityConfig { enable_metrics: true, ..Default::default() };
        assert_eq!(config.metrics_bind_address(), Some("0.0.0.0:9090".to_string()));
        assert_eq!(ObservabilityConfig::default().metrics_bind_address(), None);
    }

    #[test]
    fn test_auth_config_expiry_and_algorithm() {
        let config = AuthConfig { token_expiry_minutes: 90, ..Default::default() };
        assert_eq!(config.token_expiry(), Duration::from_secs(5400));
        assert_eq!(config.algorithm().unwrap(), Algorithm::HS256);

        let lower = AuthConfig { jwt_algorithm: "hs512".to_string(), ..Default::default() };
        assert_eq!(lower.algorithm().unwrap(), Algorithm::HS512);

        let asymmetric = AuthConfig { jwt_algorithm: "RS256".to_string(), ..Default::default() };
        assert!(asymmetric.algorithm().is_err());

        let bogus = AuthConfig { jwt_algorithm: "none".to_string(), ..Default::default() };
        assert!(bogus.algorithm().is_err());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = AppConfig::default();
        config.observability.enable_metrics = true;
        config.observability.metrics_port = config.server.port;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.url = "postgresql://localhost/db".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_ranges() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 200;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.auth.token_expiry_minutes = 0;
        assert!(config.validate().is_err());
    }
}
