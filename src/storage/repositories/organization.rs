//! Organization repository
//!
//! Reads go straight to the database; writes are staged in a
//! [`UnitOfWork`] and committed together by [`OrganizationRepository::save`].

use crate::domain::{Organization, OrganizationId, OrganizationPatch};
use crate::errors::{Result, SchoolApiError};
use crate::storage::unit_of_work::{EntityState, Persistable, UnitOfWork};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

// Database row structures

#[derive(Debug, Clone, FromRow)]
struct OrganizationRow {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: OrganizationId::from_string(row.id),
            name: row.name,
            address: row.address,
            city: row.city,
            country: row.country,
        }
    }
}

#[async_trait]
impl Persistable for Organization {
    type Id = OrganizationId;
    const ENTITY: &'static str = "organization";

    fn id(&self) -> &OrganizationId {
        &self.id
    }

    fn ensure_id(&mut self) {
        if self.id.is_unset() {
            self.id = OrganizationId::new();
        }
    }

    async fn insert(&self, conn: &mut SqliteConnection) -> std::result::Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO organizations (id, name, address, city, country) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&self.id)
        .bind(&self.name)
        .bind(&self.address)
        .bind(&self.city)
        .bind(&self.country)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn update(&self, conn: &mut SqliteConnection) -> std::result::Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE organizations SET name = $1, address = $2, city = $3, country = $4 WHERE id = $5",
        )
        .bind(&self.name)
        .bind(&self.address)
        .bind(&self.city)
        .bind(&self.country)
        .bind(&self.id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, conn: &mut SqliteConnection) -> std::result::Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM organizations WHERE id = $1")
            .bind(&self.id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }
}

// Repository trait

/// Unit-of-work repository over organizations.
///
/// `track_changes` registers the returned entities with the unit of work;
/// without it the caller gets detached snapshots.
#[async_trait]
pub trait OrganizationRepository: Send {
    /// All organizations ordered by name, then id
    async fn get_all(&mut self, track_changes: bool) -> Result<Vec<Organization>>;

    /// A single organization; absent is `Ok(None)`
    async fn get_by_id(
        &mut self,
        id: &OrganizationId,
        track_changes: bool,
    ) -> Result<Option<Organization>>;

    /// Stage an insert, generating an id when the entity has none
    fn create(&mut self, organization: Organization) -> Organization;

    /// Merge `patch` into `target` and stage the result as modified
    fn update(&mut self, target: &mut Organization, patch: OrganizationPatch);

    /// Stage removal
    fn delete(&mut self, organization: Organization);

    /// Commit all staged changes atomically
    async fn save(&mut self) -> Result<()>;

    /// Drop all staged changes
    fn discard(&mut self);

    /// Tracking state of an organization within this repository instance
    fn state(&self, id: &OrganizationId) -> Option<EntityState>;
}

// SQLx implementation

pub struct SqlxOrganizationRepository {
    pool: DbPool,
    unit_of_work: UnitOfWork<Organization>,
}

impl SqlxOrganizationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { unit_of_work: UnitOfWork::new(pool.clone()), pool }
    }
}

#[async_trait]
impl OrganizationRepository for SqlxOrganizationRepository {
    #[instrument(skip(self), name = "db_list_organizations")]
    async fn get_all(&mut self, track_changes: bool) -> Result<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, address, city, country FROM organizations ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SchoolApiError::database(e, "Failed to list organizations"))?;

        let organizations: Vec<Organization> = rows.into_iter().map(Organization::from).collect();

        if track_changes {
            for organization in &organizations {
                self.unit_of_work.attach(organization);
            }
        }

        Ok(organizations)
    }

    #[instrument(skip(self), fields(org_id = %id), name = "db_get_organization_by_id")]
    async fn get_by_id(
        &mut self,
        id: &OrganizationId,
        track_changes: bool,
    ) -> Result<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, address, city, country FROM organizations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            SchoolApiError::database(e, format!("Failed to fetch organization by ID: {}", id))
        })?;

        let organization = row.map(Organization::from);

        if track_changes {
            if let Some(organization) = &organization {
                self.unit_of_work.attach(organization);
            }
        }

        Ok(organization)
    }

    fn create(&mut self, organization: Organization) -> Organization {
        self.unit_of_work.stage_insert(organization)
    }

    fn update(&mut self, target: &mut Organization, patch: OrganizationPatch) {
        if !self.unit_of_work.is_tracked(&target.id) {
            self.unit_of_work.attach(target);
        }
        patch.apply_to(target);
        self.unit_of_work.stage_update(target.clone());
    }

    fn delete(&mut self, organization: Organization) {
        self.unit_of_work.stage_delete(organization);
    }

    async fn save(&mut self) -> Result<()> {
        self.unit_of_work.save().await
    }

    fn discard(&mut self) {
        self.unit_of_work.discard();
    }

    fn state(&self, id: &OrganizationId) -> Option<EntityState> {
        self.unit_of_work.state(id)
    }
}
