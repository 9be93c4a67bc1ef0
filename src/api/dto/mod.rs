//! Data Transfer Objects (DTOs) for API layer
//!
//! DTOs define the external JSON contract (PascalCase keys) and stay separate
//! from domain entities so either side can evolve independently.
//!
//! ```text
//! HTTP Request → DTO → Domain Entity → Repository → Database
//! HTTP Response ← DTO ← Domain Entity ← Repository ← Database
//! ```
//!
//! The student login and registration payloads live with the student model in
//! [`crate::auth::student`] and are re-exported here.

pub mod organization;

pub use crate::auth::student::{StudentForAuthenticationDto, StudentForRegistrationDto};
pub use organization::{
    OrganizationDto, OrganizationForCreationDto, OrganizationForUpdateDto, TokenResponse,
};
