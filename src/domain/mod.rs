//! Domain layer
//!
//! Pure domain entities with no HTTP or database dependencies beyond the
//! SQLx codecs on the id newtypes.
//!
//! - `id`: type-safe identifiers
//! - `organization`: the organization entity and its merge patch

pub mod id;
pub mod organization;

pub use id::{OrganizationId, RoleId, StudentId};
pub use organization::{Organization, OrganizationPatch};
