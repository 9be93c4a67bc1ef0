//! # Error Handling
//!
//! Crate-wide error type and result alias. HTTP mapping lives in
//! [`crate::api::error`].

pub mod types;

pub use types::{AuthErrorType, Result, SchoolApiError};

/// Short alias used throughout the crate
pub type Error = SchoolApiError;
