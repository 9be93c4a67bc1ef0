//! # Storage and Persistence
//!
//! SQLite connectivity, embedded migrations, the unit of work and the
//! repositories built on it.

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod unit_of_work;

pub use crate::config::DatabaseConfig;

pub use migrations::{
    get_migration_version, list_applied_migrations, run_migrations as run_db_migrations,
    validate_migrations, MigrationInfo,
};
pub use pool::{create_pool, get_pool_stats, DbPool, PoolStats};
pub use repositories::{
    OrganizationRepository, SqlxOrganizationRepository, SqlxStudentRepository, StudentRepository,
};
pub use unit_of_work::{EntityState, Persistable, UnitOfWork};

use crate::errors::{Result, SchoolApiError};

/// Run database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    migrations::run_migrations(pool).await
}

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| SchoolApiError::database(e, "Database connectivity check failed"))?;

    Ok(())
}
