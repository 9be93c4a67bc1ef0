//! Credential validation and token creation for a single login attempt.

use std::sync::{Arc, LazyLock};

use tracing::{error, info, instrument, warn};

use crate::auth::credential_store::CredentialStore;
use crate::auth::hashing;
use crate::auth::jwt::TokenIssuer;
use crate::auth::student::{Student, StudentForAuthenticationDto};
use crate::errors::{Error, Result};
use crate::observability::metrics;

/// Verified against when the user name is unknown so both paths cost one Argon2 check.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value")
        .unwrap_or_else(|_| "$argon2id$v=19$m=768,t=1,p=1$dW5rbm93bg$dW5rbm93bg".to_string())
});

/// Validates one set of credentials and issues a token for them.
///
/// A manager is created per request. The validated student is cached on the
/// instance and `create_token` refuses to run without it.
pub struct AuthenticationManager {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<TokenIssuer>,
    student: Option<Student>,
}

impl AuthenticationManager {
    pub fn new(store: Arc<dyn CredentialStore>, issuer: Arc<TokenIssuer>) -> Self {
        Self { store, issuer, student: None }
    }

    /// The student accepted by the last successful `validate_student`
    pub fn student(&self) -> Option<&Student> {
        self.student.as_ref()
    }

    /// Check user name and password against the credential store.
    ///
    /// Unknown users, wrong passwords and unreadable stored hashes all yield
    /// `Ok(false)`; only store failures are errors.
    #[instrument(skip(self, credentials), fields(user_name = ?credentials.user_name))]
    pub async fn validate_student(
        &mut self,
        credentials: &StudentForAuthenticationDto,
    ) -> Result<bool> {
        self.student = None;

        let (Some(user_name), Some(password)) =
            (credentials.user_name.as_deref(), credentials.password.as_deref())
        else {
            metrics::record_authentication("invalid_credentials").await;
            return Ok(false);
        };

        let Some(stored) = self.store.find_by_username(user_name).await? else {
            if let Err(e) = hashing::verify_password(password, &DUMMY_HASH) {
                warn!(error = %e, "dummy hash verification failed unexpectedly");
            }
            warn!("login attempt for unknown user name");
            metrics::record_authentication("invalid_credentials").await;
            return Ok(false);
        };

        let verified = match self.store.verify_password(&stored, password) {
            Ok(verified) => verified,
            Err(e) => {
                error!(
                    student_id = %stored.student.id,
                    error = %e,
                    "stored password hash could not be verified"
                );
                false
            }
        };

        if !verified {
            warn!(student_id = %stored.student.id, "login attempt with wrong password");
            metrics::record_authentication("invalid_credentials").await;
            return Ok(false);
        }

        info!(student_id = %stored.student.id, "student authenticated");
        metrics::record_authentication("success").await;
        self.student = Some(stored.student);
        Ok(true)
    }

    /// Sign a token for the validated student with one `role` claim per role
    #[instrument(skip(self))]
    pub async fn create_token(&self) -> Result<String> {
        let student = self.student.as_ref().ok_or_else(|| {
            Error::invalid_operation("create_token called before a successful validate_student")
        })?;

        let roles = self.store.list_roles(student).await?;
        self.issuer.issue(&student.user_name, &roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential_store::NewIdentity;
    use crate::auth::student::StudentCredentials;
    use crate::config::AuthConfig;
    use crate::domain::StudentId;
    use async_trait::async_trait;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStore {
        students: Mutex<HashMap<String, (StudentCredentials, Vec<String>)>>,
        unavailable: bool,
    }

    impl InMemoryStore {
        fn with_student(user_name: &str, password: &str, roles: &[&str]) -> Self {
            let store = Self::default();
            let credentials = StudentCredentials {
                student: Student {
                    id: StudentId::new(),
                    user_name: user_name.to_string(),
                    email: None,
                    phone_number: None,
                    first_name: None,
                    last_name: None,
                    created_at: Utc::now(),
                },
                password_hash: hashing::hash_password(password).unwrap(),
            };
            store.students.lock().unwrap().insert(
                Student::normalize_user_name(user_name),
                (credentials, roles.iter().map(|r| r.to_string()).collect()),
            );
            store
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryStore {
        async fn find_by_username(&self, user_name: &str) -> Result<Option<StudentCredentials>> {
            if self.unavailable {
                return Err(Error::database(sqlx::Error::PoolClosed, "store unavailable"));
            }
            let students = self.students.lock().unwrap();
            Ok(students.get(&Student::normalize_user_name(user_name)).map(|(c, _)| c.clone()))
        }

        fn verify_password(&self, credentials: &StudentCredentials, password: &str) -> Result<bool> {
            hashing::verify_password(password, &credentials.password_hash)
        }

        async fn list_roles(&self, student: &Student) -> Result<Vec<String>> {
            let students = self.students.lock().unwrap();
            Ok(students
                .get(&Student::normalize_user_name(&student.user_name))
                .map(|(_, roles)| roles.clone())
                .unwrap_or_default())
        }

        async fn role_exists(&self, _role_name: &str) -> Result<bool> {
            Ok(true)
        }

        async fn assign_roles(&self, _student: &Student, _role_names: &[String]) -> Result<()> {
            Ok(())
        }

        async fn create_identity(
            &self,
            _identity: NewIdentity,
            _password: &str,
            _role_names: &[String],
        ) -> Result<Student> {
            Err(Error::internal("not supported by the in-memory store"))
        }
    }

    fn manager(store: InMemoryStore) -> AuthenticationManager {
        let issuer = TokenIssuer::from_config(&AuthConfig::default()).unwrap();
        AuthenticationManager::new(Arc::new(store), Arc::new(issuer))
    }

    #[tokio::test]
    async fn valid_credentials_issue_token_with_roles() {
        let mut manager = manager(InMemoryStore::with_student("jdoe", "Passw0rd!", &["Manager"]));

        let valid = manager
            .validate_student(&StudentForAuthenticationDto::new("JDoe", "Passw0rd!"))
            .await
            .unwrap();
        assert!(valid);
        assert_eq!(manager.student().map(|s| s.user_name.as_str()), Some("jdoe"));

        let token = manager.create_token().await.unwrap();
        let claims = manager.issuer.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "jdoe");
        assert_eq!(claims.role, vec!["Manager".to_string()]);
    }

    #[tokio::test]
    async fn unknown_user_is_not_an_error() {
        let mut manager = manager(InMemoryStore::default());

        let valid = manager
            .validate_student(&StudentForAuthenticationDto::new("ghost", "Passw0rd!"))
            .await
            .unwrap();
        assert!(!valid);
        assert!(manager.student().is_none());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let mut manager = manager(InMemoryStore::with_student("jdoe", "Passw0rd!", &[]));
        let credentials =
            StudentForAuthenticationDto { user_name: Some("jdoe".into()), password: None };

        assert!(!manager.validate_student(&credentials).await.unwrap());
    }

    #[tokio::test]
    async fn create_token_requires_validation() {
        let manager = manager(InMemoryStore::with_student("jdoe", "Passw0rd!", &[]));

        let err = manager.create_token().await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperation { .. }));
    }

    #[tokio::test]
    async fn failed_validation_clears_previous_success() {
        let mut manager = manager(InMemoryStore::with_student("jdoe", "Passw0rd!", &[]));
        assert!(manager
            .validate_student(&StudentForAuthenticationDto::new("jdoe", "Passw0rd!"))
            .await
            .unwrap());
        assert!(!manager
            .validate_student(&StudentForAuthenticationDto::new("jdoe", "wrong"))
            .await
            .unwrap());

        assert!(manager.create_token().await.is_err());
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_a_failed_login() {
        let store = InMemoryStore::with_student("jdoe", "Passw0rd!", &["Manager"]);
        for (credentials, _) in store.students.lock().unwrap().values_mut() {
            credentials.password_hash = "not-a-phc-string".to_string();
        }
        let mut manager = manager(store);

        let valid = manager
            .validate_student(&StudentForAuthenticationDto::new("jdoe", "Passw0rd!"))
            .await
            .unwrap();
        assert!(!valid);
        assert!(manager.student().is_none());
        assert!(matches!(manager.create_token().await, Err(Error::InvalidOperation { .. })));
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let store = InMemoryStore { unavailable: true, ..Default::default() };
        let mut manager = manager(store);

        let err = manager
            .validate_student(&StudentForAuthenticationDto::new("jdoe", "Passw0rd!"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database { .. }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn only_the_registered_password_validates(candidate in "[ -~]{0,24}") {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let mut manager = manager(InMemoryStore::with_student("jdoe", "Passw0rd!", &[]));

            let valid = runtime
                .block_on(manager.validate_student(&StudentForAuthenticationDto::new("jdoe", candidate.as_str())))
                .unwrap();
            prop_assert_eq!(valid, candidate == "Passw0rd!");

            let exact = runtime
                .block_on(manager.validate_student(&StudentForAuthenticationDto::new("jdoe", "Passw0rd!")))
                .unwrap();
            prop_assert!(exact);
        }
    }
}
