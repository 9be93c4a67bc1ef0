//! # Database Migration Management
//!
//! Schema evolution using SQL migrations embedded in the binary. Each
//! migration runs in its own transaction and is recorded, with a checksum of
//! its SQL, in the `_school_api_migrations` ledger table.

use crate::errors::{Result, SchoolApiError};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use tracing::{error, info, warn};

/// Ledger table recording applied migrations
const MIGRATIONS_TABLE: &str = "_school_api_migrations";

/// An embedded migration: version, description and SQL body
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub sql: &'static str,
}

/// Migrations in application order
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 20210501000001,
        description: "create_identity_tables",
        sql: r#"
CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY NOT NULL,
    user_name TEXT NOT NULL,
    normalized_user_name TEXT NOT NULL UNIQUE,
    email TEXT,
    phone_number TEXT,
    first_name TEXT,
    last_name TEXT,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS roles (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    normalized_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS student_roles (
    student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    PRIMARY KEY (student_id, role_id)
);

CREATE INDEX IF NOT EXISTS idx_student_roles_role_id ON student_roles(role_id);
"#,
    },
    Migration {
        version: 20210501000002,
        description: "create_organizations_table",
        sql: r#"
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL CHECK (length(name) <= 60),
    address TEXT CHECK (address IS NULL OR length(address) <= 120),
    city TEXT CHECK (city IS NULL OR length(city) <= 60),
    country TEXT CHECK (country IS NULL OR length(country) <= 60)
);

CREATE INDEX IF NOT EXISTS idx_organizations_name ON organizations(name);
"#,
    },
    Migration {
        version: 20210510225042,
        description: "seed_roles",
        sql: r#"
INSERT OR IGNORE INTO roles (id, name, normalized_name)
VALUES ('548c9c9d-7af4-4699-a06a-55a179c9ac61', 'Manager', 'MANAGER');

INSERT OR IGNORE INTO roles (id, name, normalized_name)
VALUES ('6d37d5da-2545-49f3-b161-4acd310040b0', 'Administrator', 'ADMINISTRATOR');
"#,
    },
];

/// Migration information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
    pub installed_on: chrono::DateTime<chrono::Utc>,
    pub execution_time: i64,
    pub checksum: Vec<u8>,
}

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Starting database migration process");

    create_migration_table(pool).await?;

    let applied = get_applied_migration_versions(pool).await?;

    let mut migrations_run = 0;
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            info!(version = migration.version, "Migration already applied: {}", migration.description);
            continue;
        }

        info!(version = migration.version, "Running migration: {}", migration.description);
        let start_time = std::time::Instant::now();

        let mut tx = pool
            .begin()
            .await
            .map_err(|e| SchoolApiError::database(e, "Failed to start migration transaction"))?;

        // raw_sql supports multi-statement bodies
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(|e| {
            error!(error = %e, migration = migration.description, "Migration failed");
            SchoolApiError::database(e, format!("Migration failed: {}", migration.description))
        })?;

        let execution_time = start_time.elapsed().as_millis() as i64;
        let checksum = calculate_checksum(migration.sql);
        let now = chrono::Utc::now();

        sqlx::query(&format!(
            "INSERT INTO {} (version, description, checksum, execution_time, installed_on) VALUES ($1, $2, $3, $4, $5)",
            MIGRATIONS_TABLE
        ))
        .bind(migration.version)
        .bind(migration.description)
        .bind(&checksum)
        .bind(execution_time)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, migration = migration.description, "Failed to record migration");
            SchoolApiError::database(
                e,
                format!("Failed to record migration: {}", migration.description),
            )
        })?;

        tx.commit()
            .await
            .map_err(|e| SchoolApiError::database(e, "Failed to commit migration transaction"))?;

        migrations_run += 1;
        info!(
            version = migration.version,
            execution_time_ms = execution_time,
            "Migration completed: {}",
            migration.description
        );
    }

    if migrations_run > 0 {
        info!(count = migrations_run, "Database migrations completed");
    } else {
        info!("No pending migrations");
    }

    Ok(())
}

/// Create the migration tracking table
async fn create_migration_table(pool: &DbPool) -> Result<()> {
    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {} (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            checksum BLOB NOT NULL,
            execution_time INTEGER NOT NULL,
            installed_on TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
    "#,
        MIGRATIONS_TABLE
    ))
    .execute(pool)
    .await
    .map_err(|e| SchoolApiError::database(e, "Failed to create migration tracking table"))?;

    Ok(())
}

/// Whether a query failed only because the ledger table does not exist yet
fn is_missing_ledger(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db_err) if db_err.message().contains("no such table"))
}

/// Get list of applied migration versions
async fn get_applied_migration_versions(pool: &DbPool) -> Result<Vec<i64>> {
    let rows = sqlx::query(&format!("SELECT version FROM {} ORDER BY version", MIGRATIONS_TABLE))
        .fetch_all(pool)
        .await;

    match rows {
        Ok(rows) => Ok(rows.into_iter().map(|row| row.get::<i64, _>("version")).collect()),
        Err(e) if is_missing_ledger(&e) => Ok(Vec::new()),
        Err(e) => Err(SchoolApiError::database(e, "Failed to get applied migrations")),
    }
}

/// Calculate checksum for migration content
fn calculate_checksum(content: &str) -> Vec<u8> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish().to_le_bytes().to_vec()
}

/// Validate that exactly the embedded migrations are applied, with matching checksums
pub async fn validate_migrations(pool: &DbPool) -> Result<bool> {
    info!("Validating migration integrity");

    let applied = list_applied_migrations(pool).await?;

    for migration in MIGRATIONS {
        match applied.iter().find(|info| info.version == migration.version) {
            None => {
                warn!(version = migration.version, "Missing migration");
                return Ok(false);
            }
            Some(info) if info.checksum != calculate_checksum(migration.sql) => {
                warn!(version = migration.version, "Migration checksum mismatch");
                return Ok(false);
            }
            Some(_) => {}
        }
    }

    for info in &applied {
        if !MIGRATIONS.iter().any(|migration| migration.version == info.version) {
            warn!(version = info.version, "Unexpected migration found");
            return Ok(false);
        }
    }

    info!("Migration validation successful");
    Ok(true)
}

/// Get the current migration version (highest applied)
pub async fn get_migration_version(pool: &DbPool) -> Result<i64> {
    let applied = get_applied_migration_versions(pool).await?;
    Ok(applied.into_iter().max().unwrap_or(0))
}

/// List all applied migrations
pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    let rows = sqlx::query(&format!(
        "SELECT version, description, checksum, execution_time, installed_on FROM {} ORDER BY version",
        MIGRATIONS_TABLE
    ))
    .fetch_all(pool)
    .await;

    match rows {
        Ok(rows) => Ok(rows
            .into_iter()
            .map(|row| MigrationInfo {
                version: row.get("version"),
                description: row.get("description"),
                installed_on: row.get("installed_on"),
                execution_time: row.get("execution_time"),
                checksum: row.get("checksum"),
            })
            .collect()),
        Err(e) if is_missing_ledger(&e) => Ok(Vec::new()),
        Err(e) => Err(SchoolApiError::database(e, "Failed to list applied migrations")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::storage::create_pool;

    async fn empty_pool() -> DbPool {
        let config = DatabaseConfig { auto_migrate: false, ..DatabaseConfig::in_memory() };
        create_pool(&config).await.unwrap()
    }

    #[test]
    fn test_migrations_are_ordered() {
        let versions: Vec<i64> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn test_calculate_checksum() {
        let checksum1 = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let checksum2 = calculate_checksum("CREATE TABLE test (id INTEGER);");
        let checksum3 = calculate_checksum("CREATE TABLE other (id INTEGER);");

        assert_eq!(checksum1, checksum2);
        assert_ne!(checksum1, checksum3);
    }

    #[tokio::test]
    async fn test_fresh_database_has_no_version() {
        let pool = empty_pool().await;
        assert_eq!(get_migration_version(&pool).await.unwrap(), 0);
        assert!(list_applied_migrations(&pool).await.unwrap().is_empty());
        assert!(!validate_migrations(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = empty_pool().await;

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let applied = list_applied_migrations(&pool).await.unwrap();
        assert_eq!(applied.len(), MIGRATIONS.len());
        assert_eq!(get_migration_version(&pool).await.unwrap(), 20210510225042);
        assert!(validate_migrations(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_seeded_roles() {
        let pool = empty_pool().await;
        run_migrations(&pool).await.unwrap();

        let rows = sqlx::query("SELECT id, name FROM roles ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        let roles: Vec<(String, String)> =
            rows.iter().map(|row| (row.get("id"), row.get("name"))).collect();

        assert_eq!(
            roles,
            vec![
                (
                    "6d37d5da-2545-49f3-b161-4acd310040b0".to_string(),
                    "Administrator".to_string()
                ),
                ("548c9c9d-7af4-4699-a06a-55a179c9ac61".to_string(), "Manager".to_string()),
            ]
        );
    }
}
