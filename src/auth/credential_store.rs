//! Credential store abstraction over student accounts and roles.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::hashing;
use crate::auth::student::{NewStudent, Student, StudentCredentials};
use crate::domain::{RoleId, StudentId};
use crate::errors::{Error, Result};
use crate::storage::repositories::{SqlxStudentRepository, StudentRepository};
use crate::storage::DbPool;

/// Profile fields of an identity about to be created.
#[derive(Debug, Clone, Default)]
pub struct NewIdentity {
    pub user_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Lookup, verification and creation of student identities.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-insensitive lookup by user name
    async fn find_by_username(&self, user_name: &str) -> Result<Option<StudentCredentials>>;

    /// Check a candidate password against the stored hash
    fn verify_password(&self, credentials: &StudentCredentials, password: &str) -> Result<bool>;

    /// Role names assigned to the student
    async fn list_roles(&self, student: &Student) -> Result<Vec<String>>;

    async fn role_exists(&self, role_name: &str) -> Result<bool>;

    /// Assign roles by name; every name must exist
    async fn assign_roles(&self, student: &Student, role_names: &[String]) -> Result<()>;

    /// Hash the password and persist the identity with its roles atomically
    async fn create_identity(
        &self,
        identity: NewIdentity,
        password: &str,
        role_names: &[String],
    ) -> Result<Student>;
}

/// Credential store backed by the SQLite student repository.
#[derive(Clone)]
pub struct SqlxCredentialStore {
    repository: Arc<dyn StudentRepository>,
}

impl SqlxCredentialStore {
    pub fn new(repository: Arc<dyn StudentRepository>) -> Self {
        Self { repository }
    }

    pub fn with_sqlx(pool: DbPool) -> Self {
        Self::new(Arc::new(SqlxStudentRepository::new(pool)))
    }

    async fn resolve_roles(&self, role_names: &[String]) -> Result<Vec<RoleId>> {
        let mut ids = Vec::with_capacity(role_names.len());
        for name in role_names {
            match self.repository.find_role_by_name(name).await? {
                Some(role) => ids.push(role.id),
                None => {
                    return Err(Error::validation_field(
                        format!("Role '{}' does not exist", name),
                        "Roles",
                    ))
                }
            }
        }
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl CredentialStore for SqlxCredentialStore {
    async fn find_by_username(&self, user_name: &str) -> Result<Option<StudentCredentials>> {
        self.repository.find_by_user_name(user_name).await
    }

    fn verify_password(&self, credentials: &StudentCredentials, password: &str) -> Result<bool> {
        hashing::verify_password(password, &credentials.password_hash)
    }

    async fn list_roles(&self, student: &Student) -> Result<Vec<String>> {
        self.repository.list_role_names(&student.id).await
    }

    async fn role_exists(&self, role_name: &str) -> Result<bool> {
        Ok(self.repository.find_role_by_name(role_name).await?.is_some())
    }

    async fn assign_roles(&self, student: &Student, role_names: &[String]) -> Result<()> {
        let ids = self.resolve_roles(role_names).await?;
        self.repository.assign_roles(&student.id, &ids).await
    }

    async fn create_identity(
        &self,
        identity: NewIdentity,
        password: &str,
        role_names: &[String],
    ) -> Result<Student> {
        let roles = self.resolve_roles(role_names).await?;
        let password_hash = hashing::hash_password(password)?;

        let student = NewStudent {
            id: StudentId::new(),
            user_name: identity.user_name,
            email: identity.email,
            phone_number: identity.phone_number,
            first_name: identity.first_name,
            last_name: identity.last_name,
            password_hash,
        };

        self.repository.create_student(student, &roles).await
    }
}
