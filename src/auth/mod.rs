//! Authentication and authorization module entry point.
//!
//! Student accounts, password hashing, JWT issuance, registration rules and
//! the axum middleware that guards role-restricted routes.

pub mod authentication_manager;
pub mod credential_store;
pub mod hashing;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod registration;
pub mod student;

pub use authentication_manager::AuthenticationManager;
pub use credential_store::{CredentialStore, NewIdentity, SqlxCredentialStore};
pub use jwt::{Claims, TokenIssuer};
pub use models::{AuthContext, AuthError};
pub use registration::{IdentityError, PasswordPolicy, RegistrationError, RegistrationService};
pub use student::{
    Role, RoleRecord, Student, StudentCredentials, StudentForAuthenticationDto,
    StudentForRegistrationDto,
};
