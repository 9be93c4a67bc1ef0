//! Request-scoped authentication context and middleware errors.

use std::collections::BTreeSet;

use thiserror::Error;

/// Identity of the caller, derived from a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_name: String,
    roles: BTreeSet<String>,
}

impl AuthContext {
    pub fn new(user_name: impl Into<String>, roles: Vec<String>) -> Self {
        Self { user_name: user_name.into(), roles: roles.into_iter().collect() }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        roles.iter().any(|role| self.has_role(role.as_ref()))
    }

    pub fn roles(&self) -> impl Iterator<Item = &String> {
        self.roles.iter()
    }
}

/// Errors returned by authentication middleware.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized: bearer token missing")]
    MissingBearer,
    #[error("unauthorized: malformed bearer token")]
    MalformedBearer,
    #[error("unauthorized: invalid token")]
    InvalidToken,
    #[error("unauthorized: token expired")]
    ExpiredToken,
    #[error("forbidden: missing required role")]
    Forbidden,
}
