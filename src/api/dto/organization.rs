//! Organization DTOs for API request/response handling

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::{Organization, OrganizationId, OrganizationPatch};

const NAME_REQUIRED: &str = "Organization name is a required field.";

/// Organization as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct OrganizationDto {
    pub id: OrganizationId,
    #[schema(example = "Acme")]
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl From<Organization> for OrganizationDto {
    fn from(organization: Organization) -> Self {
        Self {
            id: organization.id,
            name: organization.name,
            address: organization.address,
            city: organization.city,
            country: organization.country,
        }
    }
}

/// Request body for creating an organization
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "PascalCase")]
#[schema(example = json!({
    "Name": "Acme",
    "Address": "1 Main Street",
    "City": "Springfield",
    "Country": "USA"
}))]
pub struct OrganizationForCreationDto {
    #[validate(
        required(message = "Organization name is a required field."),
        length(max = 60, message = "Maximum length for the Name is 60 characters.")
    )]
    pub name: Option<String>,

    #[validate(length(max = 120, message = "Maximum length for the Address is 120 characters."))]
    pub address: Option<String>,

    #[validate(length(max = 60, message = "Maximum length for the City is 60 characters."))]
    pub city: Option<String>,

    #[validate(length(max = 60, message = "Maximum length for the Country is 60 characters."))]
    pub country: Option<String>,
}

impl OrganizationForCreationDto {
    /// Length rules plus the rejection of a blank `Name`
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();

        if self.name.as_deref().is_some_and(is_blank) {
            add_name_required(&mut errors);
        }

        into_result(errors)
    }

    /// Unsaved entity; the id is assigned when the create is staged.
    pub fn into_organization(self) -> Organization {
        Organization {
            id: OrganizationId::nil(),
            name: self.name.unwrap_or_default(),
            address: self.address,
            city: self.city,
            country: self.country,
        }
    }
}

/// Request body for updating an organization.
///
/// Absent fields are left unchanged. An explicit `null` clears `Address`,
/// `City` or `Country`; `Name` cannot be cleared.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "PascalCase")]
#[schema(example = json!({"City": "Shelbyville", "Country": null}))]
pub struct OrganizationForUpdateDto {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 60, message = "Maximum length for the Name is 60 characters."))]
    pub name: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable)]
    #[validate(length(max = 120, message = "Maximum length for the Address is 120 characters."))]
    pub address: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable)]
    #[validate(length(max = 60, message = "Maximum length for the City is 60 characters."))]
    pub city: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable)]
    #[validate(length(max = 60, message = "Maximum length for the Country is 60 characters."))]
    pub country: Option<Option<String>>,
}

impl OrganizationForUpdateDto {
    /// Length rules plus the rejection of an explicit `"Name": null` or a blank `Name`
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();

        match &self.name {
            Some(None) => add_name_required(&mut errors),
            Some(Some(name)) if is_blank(name) => add_name_required(&mut errors),
            _ => {}
        }

        into_result(errors)
    }

    pub fn into_patch(self) -> OrganizationPatch {
        OrganizationPatch {
            name: self.name.flatten(),
            address: self.address,
            city: self.city,
            country: self.country,
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn add_name_required(errors: &mut ValidationErrors) {
    errors.add("name", ValidationError::new("required").with_message(NAME_REQUIRED.into()));
}

fn into_result(errors: ValidationErrors) -> Result<(), ValidationErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Keeps `null` distinct from an absent field: absent -> `None`, `null` -> `Some(None)`
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct TokenResponse {
    pub token: String,
}
