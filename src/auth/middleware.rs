//! Axum middleware for bearer authentication and role checks.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Extension, State},
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{field, info_span, warn, Instrument, Span};

use crate::api::error::ApiError;
use crate::auth::jwt::TokenIssuer;
use crate::auth::models::{AuthContext, AuthError};

pub type TokenIssuerState = Arc<TokenIssuer>;
pub type RoleState = Arc<Vec<String>>;

/// Validates the bearer token and stores the caller's [`AuthContext`] in the request extensions.
pub async fn authenticate(
    State(issuer): State<TokenIssuerState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let request_span = Span::current();
    let span = info_span!(
        "auth_middleware.authenticate",
        http.method = %request.method(),
        http.path = %request.uri().path(),
        auth.subject = field::Empty
    );

    let header =
        request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()).unwrap_or("");

    let context = match parse_bearer(header).and_then(|token| issuer.validate_token(token)) {
        Ok(claims) => AuthContext::new(claims.sub, claims.role),
        Err(err) => {
            span.in_scope(|| warn!(error = %err, "authentication failed"));
            return Err(err.into());
        }
    };

    span.record("auth.subject", field::display(&context.user_name));
    request_span.record("user_name", field::display(&context.user_name));
    request.extensions_mut().insert(context);

    Ok(next.run(request).instrument(span).await)
}

/// Rejects callers holding none of the required roles.
pub async fn require_roles(
    State(required_roles): State<RoleState>,
    Extension(context): Extension<AuthContext>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if context.has_any_role(required_roles.as_slice()) {
        return Ok(next.run(request).await);
    }

    warn!(
        user_name = %context.user_name,
        required = %required_roles.join(" "),
        granted = %context.roles().map(String::as_str).collect::<Vec<_>>().join(" "),
        "role check failed"
    );
    Err(AuthError::Forbidden.into())
}

fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    if header.trim().is_empty() {
        return Err(AuthError::MissingBearer);
    }

    let (scheme, token) = header.trim().split_once(' ').ok_or(AuthError::MalformedBearer)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedBearer);
    }

    Ok(token)
}
