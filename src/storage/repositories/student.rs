//! Student and role repository
//!
//! Persistence for student accounts, the role catalogue and the
//! student-role assignments.

use crate::auth::student::{NewStudent, RoleRecord, Student, StudentCredentials};
use crate::domain::{RoleId, StudentId};
use crate::errors::{Result, SchoolApiError};
use crate::storage::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::instrument;

// Database row structures

#[derive(Debug, Clone, FromRow)]
struct StudentRow {
    pub id: String,
    pub user_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl StudentRow {
    fn into_credentials(self) -> StudentCredentials {
        StudentCredentials {
            student: Student {
                id: StudentId::from_string(self.id),
                user_name: self.user_name,
                email: self.email,
                phone_number: self.phone_number,
                first_name: self.first_name,
                last_name: self.last_name,
                created_at: self.created_at,
            },
            password_hash: self.password_hash,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct RoleRow {
    pub id: String,
    pub name: String,
}

impl From<RoleRow> for RoleRecord {
    fn from(row: RoleRow) -> Self {
        RoleRecord { id: RoleId::from_string(row.id), name: row.name }
    }
}

const STUDENT_COLUMNS: &str =
    "id, user_name, email, phone_number, first_name, last_name, password_hash, created_at";

// Repository trait

#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Insert a student and its role assignments in one transaction
    async fn create_student(&self, student: NewStudent, roles: &[RoleId]) -> Result<Student>;

    /// Look a student up by user name, ignoring case
    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<StudentCredentials>>;

    /// Names of the roles assigned to a student, alphabetical
    async fn list_role_names(&self, id: &StudentId) -> Result<Vec<String>>;

    /// Look a role up by name, ignoring case
    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleRecord>>;

    /// Add role assignments; assignments that already exist are kept
    async fn assign_roles(&self, id: &StudentId, roles: &[RoleId]) -> Result<()>;
}

// SQLx implementation

#[derive(Debug, Clone)]
pub struct SqlxStudentRepository {
    pool: DbPool,
}

impl SqlxStudentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

async fn insert_assignments(
    conn: &mut SqliteConnection,
    id: &StudentId,
    roles: &[RoleId],
) -> Result<()> {
    for role_id in roles {
        sqlx::query("INSERT OR IGNORE INTO student_roles (student_id, role_id) VALUES ($1, $2)")
            .bind(id)
            .bind(role_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                SchoolApiError::database(
                    e,
                    format!("Failed to assign role '{}' to student '{}'", role_id, id),
                )
            })?;
    }

    Ok(())
}

#[async_trait]
impl StudentRepository for SqlxStudentRepository {
    #[instrument(skip(self, student, roles), fields(user_name = %student.user_name), name = "db_create_student")]
    async fn create_student(&self, student: NewStudent, roles: &[RoleId]) -> Result<Student> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(|e| {
            SchoolApiError::database(e, "Failed to begin transaction for student creation")
        })?;

        sqlx::query(
            "INSERT INTO students (
                id, user_name, normalized_user_name, email, phone_number,
                first_name, last_name, password_hash, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&student.id)
        .bind(&student.user_name)
        .bind(Student::normalize_user_name(&student.user_name))
        .bind(&student.email)
        .bind(&student.phone_number)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| SchoolApiError::database(e, "Failed to create student"))?;

        insert_assignments(&mut *tx, &student.id, roles).await?;

        tx.commit()
            .await
            .map_err(|e| SchoolApiError::database(e, "Failed to commit student creation"))?;

        Ok(Student {
            id: student.id,
            user_name: student.user_name,
            email: student.email,
            phone_number: student.phone_number,
            first_name: student.first_name,
            last_name: student.last_name,
            created_at: now,
        })
    }

    #[instrument(skip(self), name = "db_find_student_by_user_name")]
    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<StudentCredentials>> {
        let row = sqlx::query_as::<_, StudentRow>(&format!(
            "SELECT {} FROM students WHERE normalized_user_name = $1",
            STUDENT_COLUMNS
        ))
        .bind(Student::normalize_user_name(user_name))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            SchoolApiError::database(e, format!("Failed to fetch student by user name: {}", user_name))
        })?;

        Ok(row.map(StudentRow::into_credentials))
    }

    #[instrument(skip(self), fields(student_id = %id), name = "db_list_student_roles")]
    async fn list_role_names(&self, id: &StudentId) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT r.name FROM roles r
             INNER JOIN student_roles sr ON sr.role_id = r.id
             WHERE sr.student_id = $1
             ORDER BY r.name",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            SchoolApiError::database(e, format!("Failed to list roles for student: {}", id))
        })
    }

    #[instrument(skip(self), name = "db_find_role_by_name")]
    async fn find_role_by_name(&self, name: &str) -> Result<Option<RoleRecord>> {
        let row = sqlx::query_as::<_, RoleRow>(
            "SELECT id, name FROM roles WHERE normalized_name = $1",
        )
        .bind(name.to_uppercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| SchoolApiError::database(e, format!("Failed to fetch role: {}", name)))?;

        Ok(row.map(RoleRecord::from))
    }

    #[instrument(skip(self, roles), fields(student_id = %id, role_count = roles.len()), name = "db_assign_roles")]
    async fn assign_roles(&self, id: &StudentId, roles: &[RoleId]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            SchoolApiError::database(e, "Failed to begin transaction for role assignment")
        })?;

        insert_assignments(&mut *tx, id, roles).await?;

        tx.commit()
            .await
            .map_err(|e| SchoolApiError::database(e, "Failed to commit role assignment"))
    }
}
