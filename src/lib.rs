//! # School API
//!
//! HTTP service managing organizations and student accounts.
//!
//! ```text
//! REST API (axum) → Repositories / Unit of Work → SQLite (sqlx)
//!      ↓                      ↓
//! JWT authentication    Embedded migrations
//! ```
//!
//! ## Core Components
//!
//! - **API**: axum router with organization CRUD, student login and registration
//! - **Auth**: Argon2 password hashing, JWT issuance and role checks
//! - **Storage**: SQLite pool, versioned migrations and a unit of work that
//!   commits staged changes in one transaction
//! - **Observability**: tracing subscriber and Prometheus metrics
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use school_api::{api::{start_api_server, ApiState}, storage::create_pool, Config, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let pool = create_pool(&config.database).await?;
//!     start_api_server(ApiState::new(pool, config)?).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

// Re-export commonly used types and traits
pub use config::{AppConfig, Config};
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
