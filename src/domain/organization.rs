//! Organization entity and its partial-update patch.

use serde::{Deserialize, Serialize};

use crate::domain::OrganizationId;

/// A business entity managed by the organization repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl Organization {
    /// Build an organization whose id will be assigned when it is staged for creation.
    pub fn unsaved(name: impl Into<String>) -> Self {
        Self { id: OrganizationId::nil(), name: name.into(), address: None, city: None, country: None }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// Field-level overwrite applied onto an existing [`Organization`].
///
/// `None` leaves a field untouched. For the optional columns the inner
/// `Option` distinguishes "set to this value" from "clear the value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub country: Option<Option<String>>,
}

impl OrganizationPatch {
    pub fn name(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.city.is_none() && self.country.is_none()
    }

    /// Merge the patch into `target`, returning whether any field changed.
    pub fn apply_to(self, target: &mut Organization) -> bool {
        let before = target.clone();

        if let Some(name) = self.name {
            target.name = name;
        }
        if let Some(address) = self.address {
            target.address = address;
        }
        if let Some(city) = self.city {
            target.city = city;
        }
        if let Some(country) = self.country {
            target.country = country;
        }

        *target != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Organization {
        Organization {
            id: OrganizationId::new(),
            name: "Acme".to_string(),
            address: Some("1 Main St".to_string()),
            city: Some("Springfield".to_string()),
            country: Some("US".to_string()),
        }
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut org = acme();
        let original = org.clone();

        let changed = OrganizationPatch::name("Globex").apply_to(&mut org);

        assert!(changed);
        assert_eq!(org.name, "Globex");
        assert_eq!(org.id, original.id);
        assert_eq!(org.address, original.address);
        assert_eq!(org.city, original.city);
        assert_eq!(org.country, original.country);
    }

    #[test]
    fn explicit_clear_removes_optional_value() {
        let mut org = acme();
        let patch = OrganizationPatch { city: Some(None), ..Default::default() };

        assert!(patch.apply_to(&mut org));
        assert_eq!(org.city, None);
        assert_eq!(org.country.as_deref(), Some("US"));
    }

    #[test]
    fn empty_patch_reports_no_change() {
        let mut org = acme();
        let patch = OrganizationPatch::default();
        assert!(patch.is_empty());
        assert!(!patch.apply_to(&mut org));
    }

    #[test]
    fn unsaved_organization_has_unset_id() {
        let org = Organization::unsaved("Initech").with_country("US");
        assert!(org.id.is_unset());
        assert_eq!(org.country.as_deref(), Some("US"));
    }
}
