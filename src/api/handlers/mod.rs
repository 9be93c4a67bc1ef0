//! HTTP request handlers organized by resource type

pub mod authentication;
pub mod health;
pub mod organizations;

pub use authentication::{login_handler, register_handler};
pub use health::{health_handler, HealthResponse};
pub use organizations::{
    create_organization_handler, delete_organization_handler, get_organization_handler,
    list_organizations_handler, update_organization_handler,
};
