//! # Configuration Management
//!
//! Layered configuration for the School API: built-in defaults, then an
//! optional file (TOML, YAML or JSON by extension), then environment variables
//! prefixed with `SCHOOL_API__` using `__` as the nesting separator, e.g.
//! `SCHOOL_API__AUTH__JWT_SECRET` or `SCHOOL_API__SERVER__PORT`.

pub mod settings;

pub use settings::{AppConfig, AuthConfig, DatabaseConfig, ObservabilityConfig, ServerConfig};

use crate::Result;
use config::{Environment, File};
use std::path::Path;

/// Environment variable prefix for every configuration key
pub const ENV_PREFIX: &str = "SCHOOL_API";

/// Application configuration (alias kept for the crate root re-export)
pub type Config = AppConfig;

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment, then validate it.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from the environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.auth.token_expiry_minutes, 60);
        assert!(config.database.is_sqlite());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 5001

[auth]
token_expiry_minutes = 15
jwt_issuer = "SchoolAPI-test"
"#
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.auth.token_expiry_minutes, 15);
        assert_eq!(config.auth.jwt_issuer, "SchoolAPI-test");
        // untouched sections keep their defaults
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[auth]
jwt_secret = "too-short"
"#
        )
        .unwrap();

        assert!(AppConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }
}
