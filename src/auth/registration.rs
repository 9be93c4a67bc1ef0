//! Student registration with identity-style validation.
//!
//! Every rule runs and all failures are reported together, each keyed by a
//! stable code such as `DuplicateUserName` or `PasswordTooShort`.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::auth::credential_store::{CredentialStore, NewIdentity};
use crate::auth::student::{Student, StudentForRegistrationDto};
use crate::config::AuthConfig;
use crate::errors::Error;
use crate::observability::metrics;

lazy_static! {
    static ref USER_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9\-._@+]+$")
        .expect("USER_NAME_REGEX should be a valid regex pattern");
}

/// A single registration rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityError {
    pub code: &'static str,
    pub description: String,
}

impl IdentityError {
    fn new(code: &'static str, description: impl Into<String>) -> Self {
        Self { code, description: description.into() }
    }

    pub fn duplicate_user_name(user_name: &str) -> Self {
        Self::new("DuplicateUserName", format!("Username '{}' is already taken.", user_name))
    }

    pub fn invalid_user_name(user_name: &str) -> Self {
        Self::new(
            "InvalidUserName",
            format!("Username '{}' is invalid, can only contain letters or digits.", user_name),
        )
    }

    pub fn invalid_role_name(role: &str) -> Self {
        Self::new("InvalidRoleName", format!("Role name '{}' is invalid.", role))
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("registration rejected: {}", codes(.0))]
    Rejected(Vec<IdentityError>),
    #[error(transparent)]
    Persistence(#[from] Error),
}

fn codes(errors: &[IdentityError]) -> String {
    errors.iter().map(|e| e.code).collect::<Vec<_>>().join(", ")
}

/// Password complexity rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_non_alphanumeric: bool,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_non_alphanumeric: true,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
        }
    }
}

impl PasswordPolicy {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self { required_length: config.password_min_length, ..Default::default() }
    }

    pub fn check(&self, password: &str) -> Vec<IdentityError> {
        let mut errors = Vec::new();

        if password.chars().count() < self.required_length {
            errors.push(IdentityError::new(
                "PasswordTooShort",
                format!("Passwords must be at least {} characters.", self.required_length),
            ));
        }
        if self.require_non_alphanumeric && password.chars().all(|c| c.is_ascii_alphanumeric()) {
            errors.push(IdentityError::new(
                "PasswordRequiresNonAlphanumeric",
                "Passwords must have at least one non alphanumeric character.",
            ));
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push(IdentityError::new(
                "PasswordRequiresDigit",
                "Passwords must have at least one digit ('0'-'9').",
            ));
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push(IdentityError::new(
                "PasswordRequiresLower",
                "Passwords must have at least one lowercase ('a'-'z').",
            ));
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push(IdentityError::new(
                "PasswordRequiresUpper",
                "Passwords must have at least one uppercase ('A'-'Z').",
            ));
        }

        errors
    }
}

/// Creates student accounts.
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn CredentialStore>,
    policy: PasswordPolicy,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn CredentialStore>, policy: PasswordPolicy) -> Self {
        Self { store, policy }
    }

    /// Register a student from an already shape-validated payload.
    #[instrument(skip(self, registration), fields(user_name = ?registration.user_name))]
    pub async fn register(
        &self,
        registration: StudentForRegistrationDto,
    ) -> std::result::Result<Student, RegistrationError> {
        let user_name = registration.user_name.unwrap_or_default();
        let password = registration.password.unwrap_or_default();
        let mut errors = Vec::new();

        if !USER_NAME_REGEX.is_match(&user_name) {
            errors.push(IdentityError::invalid_user_name(&user_name));
        } else if self.store.find_by_username(&user_name).await?.is_some() {
            errors.push(IdentityError::duplicate_user_name(&user_name));
        }

        errors.extend(self.policy.check(&password));

        for role in &registration.roles {
            if !self.store.role_exists(role).await? {
                errors.push(IdentityError::invalid_role_name(role));
            }
        }

        if !errors.is_empty() {
            warn!(errors = %codes(&errors), "registration rejected");
            metrics::record_registration("rejected").await;
            return Err(RegistrationError::Rejected(errors));
        }

        let identity = NewIdentity {
            user_name: user_name.clone(),
            email: registration.email,
            phone_number: registration.phone_number,
            first_name: registration.first_name,
            last_name: registration.last_name,
        };

        match self.store.create_identity(identity, &password, &registration.roles).await {
            Ok(student) => {
                info!(student_id = %student.id, "student registered");
                metrics::record_registration("success").await;
                Ok(student)
            }
            // Lost a race with a concurrent registration of the same name
            Err(e) if e.is_constraint_violation() => {
                metrics::record_registration("rejected").await;
                Err(RegistrationError::Rejected(vec![IdentityError::duplicate_user_name(
                    &user_name,
                )]))
            }
            Err(e) => {
                metrics::record_registration("error").await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential_store::SqlxCredentialStore;
    use crate::config::DatabaseConfig;
    use crate::storage::create_pool;

    async fn service() -> (RegistrationService, Arc<SqlxCredentialStore>) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let store = Arc::new(SqlxCredentialStore::with_sqlx(pool));
        (RegistrationService::new(store.clone(), PasswordPolicy::default()), store)
    }

    fn registration(user_name: &str, password: &str, roles: &[&str]) -> StudentForRegistrationDto {
        StudentForRegistrationDto {
            user_name: Some(user_name.to_string()),
            password: Some(password.to_string()),
            first_name: Some("Jane".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    fn rejected_codes(result: std::result::Result<Student, RegistrationError>) -> Vec<&'static str> {
        match result {
            Err(RegistrationError::Rejected(errors)) => errors.iter().map(|e| e.code).collect(),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn password_policy_reports_every_rule() {
        let policy = PasswordPolicy::default();
        let codes: Vec<_> = policy.check("abc").iter().map(|e| e.code).collect();

        assert_eq!(
            codes,
            vec![
                "PasswordTooShort",
                "PasswordRequiresNonAlphanumeric",
                "PasswordRequiresDigit",
                "PasswordRequiresUpper"
            ]
        );
        assert!(policy.check("Passw0rd!").is_empty());
    }

    #[test]
    fn user_name_pattern() {
        assert!(USER_NAME_REGEX.is_match("jane.doe+1@school"));
        assert!(!USER_NAME_REGEX.is_match("jane doe"));
        assert!(!USER_NAME_REGEX.is_match(""));
    }

    #[test]
    fn password_policy_uses_configured_length() {
        let policy = PasswordPolicy::from_config(&AuthConfig {
            password_min_length: 12,
            ..Default::default()
        });
        let errors = policy.check("Passw0rd!");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].description, "Passwords must be at least 12 characters.");
    }

    #[tokio::test]
    async fn successful_registration_assigns_roles() {
        let (service, store) = service().await;
        let student = service.register(registration("jdoe", "Passw0rd!", &["Manager"])).await.unwrap();

        assert_eq!(student.user_name, "jdoe");
        assert_eq!(store.list_roles(&student).await.unwrap(), vec!["Manager"]);
    }

    #[tokio::test]
    async fn duplicate_user_name_ignores_case() {
        let (service, _) = service().await;
        service.register(registration("jdoe", "Passw0rd!", &[])).await.unwrap();

        let codes = rejected_codes(service.register(registration("JDOE", "Passw0rd!", &[])).await);
        assert_eq!(codes, vec!["DuplicateUserName"]);
    }

    #[tokio::test]
    async fn all_failures_are_reported_together() {
        let (service, store) = service().await;

        let codes =
            rejected_codes(service.register(registration("bad name", "short", &["Teacher"])).await);
        assert_eq!(
            codes,
            vec![
                "InvalidUserName",
                "PasswordTooShort",
                "PasswordRequiresNonAlphanumeric",
                "PasswordRequiresDigit",
                "PasswordRequiresUpper",
                "InvalidRoleName"
            ]
        );
        assert!(store.find_by_username("bad name").await.unwrap().is_none());
    }
}
