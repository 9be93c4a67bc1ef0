//! # REST API Components
//!
//! HTTP routing, middleware wiring, request/response DTOs and error mapping
//! for the School API.

pub mod docs;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
pub use server::start_api_server;
