//! Student accounts, roles and the request payloads used to register and log in.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::{RoleId, StudentId};

/// Roles known to the API. Both are seeded by the initial migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Manager,
    Administrator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::Administrator => "Administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: String,
}

/// A registered student account. The password hash never leaves the
/// credential store, see [`StudentCredentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: StudentId,
    pub user_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Student {
    /// Case-insensitive lookup key for user names
    pub fn normalize_user_name(user_name: &str) -> String {
        user_name.to_uppercase()
    }
}

/// A student together with the stored password hash.
#[derive(Clone)]
pub struct StudentCredentials {
    pub student: Student,
    pub password_hash: String,
}

impl fmt::Debug for StudentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudentCredentials")
            .field("student", &self.student)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

/// Insert payload for a new student.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub id: StudentId,
    pub user_name: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password_hash: String,
}

/// Login payload.
#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct StudentForAuthenticationDto {
    #[validate(
        required(message = "User name is required."),
        length(min = 1, message = "User name is required.")
    )]
    #[schema(example = "jdoe")]
    pub user_name: Option<String>,

    #[validate(
        required(message = "Password is required."),
        length(min = 1, message = "Password is required.")
    )]
    #[schema(example = "Passw0rd!")]
    pub password: Option<String>,
}

impl StudentForAuthenticationDto {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self { user_name: Some(user_name.into()), password: Some(password.into()) }
    }
}

impl fmt::Debug for StudentForAuthenticationDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudentForAuthenticationDto")
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration payload.
#[derive(Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct StudentForRegistrationDto {
    #[validate(length(max = 100, message = "First name cannot exceed 100 characters."))]
    pub first_name: Option<String>,

    #[validate(length(max = 100, message = "Last name cannot exceed 100 characters."))]
    pub last_name: Option<String>,

    #[validate(
        required(message = "Username is required"),
        length(min = 1, message = "Username is required")
    )]
    #[schema(example = "jdoe")]
    pub user_name: Option<String>,

    #[validate(required(message = "Password is required"))]
    #[schema(example = "Passw0rd!")]
    pub password: Option<String>,

    #[validate(email(message = "Email is not a valid e-mail address."))]
    pub email: Option<String>,

    pub phone_number: Option<String>,

    #[serde(default)]
    #[schema(example = json!(["Manager"]))]
    pub roles: Vec<String>,
}

impl fmt::Debug for StudentForRegistrationDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudentForRegistrationDto")
            .field("user_name", &self.user_name)
            .field("email", &self.email)
            .field("roles", &self.roles)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_match_seed_data() {
        assert_eq!(Role::Manager.to_string(), "Manager");
        assert_eq!(Role::Administrator.as_str(), "Administrator");
    }

    #[test]
    fn authentication_dto_requires_both_fields() {
        let dto: StudentForAuthenticationDto = serde_json::from_str("{}").unwrap();
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();

        assert_eq!(
            fields["user_name"][0].message.as_deref(),
            Some("User name is required.")
        );
        assert_eq!(fields["password"][0].message.as_deref(), Some("Password is required."));
    }

    #[test]
    fn authentication_dto_rejects_empty_strings() {
        let dto = StudentForAuthenticationDto::new("", "");
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();

        assert_eq!(fields["user_name"].len(), 1);
        assert_eq!(fields["user_name"][0].message.as_deref(), Some("User name is required."));
        assert_eq!(fields["password"][0].message.as_deref(), Some("Password is required."));
    }

    #[test]
    fn authentication_dto_uses_pascal_case() {
        let dto: StudentForAuthenticationDto =
            serde_json::from_str(r#"{"UserName":"jdoe","Password":"secret"}"#).unwrap();
        assert!(dto.validate().is_ok());
        assert_eq!(dto.user_name.as_deref(), Some("jdoe"));
        assert!(!format!("{:?}", dto).contains("secret"));
    }

    #[test]
    fn registration_dto_validates_email() {
        let dto = StudentForRegistrationDto {
            user_name: Some("jdoe".into()),
            password: Some("Passw0rd!".into()),
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        assert!(dto.validate().unwrap_err().field_errors().contains_key("email"));
    }

    #[test]
    fn normalized_user_name_is_upper_case() {
        assert_eq!(Student::normalize_user_name("jDoe"), "JDOE");
    }
}
