//! Repository modules for data access
//!
//! Each repository handles persistence for one aggregate.

pub mod organization;
pub mod student;

pub use organization::{OrganizationRepository, SqlxOrganizationRepository};
pub use student::{SqlxStudentRepository, StudentRepository};
