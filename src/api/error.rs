use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;
use validator::ValidationErrors;

use crate::auth::models::AuthError;
use crate::auth::registration::{IdentityError, RegistrationError};
use crate::errors::{AuthErrorType, Error};

/// Field (or identity error code) to messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const INTERNAL_MESSAGE: &str = "An internal server error occurred";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation { status: StatusCode, message: String, errors: FieldErrors },
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Validation { status, .. } => *status,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_kind, message, errors) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Validation { status, message, errors } => {
                let kind = if status == StatusCode::UNPROCESSABLE_ENTITY {
                    "unprocessable_entity"
                } else {
                    "validation_failed"
                };
                (kind, message, (!errors.is_empty()).then_some(errors))
            }
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::Internal(msg) => ("internal_error", msg, None),
        };

        (status, Json(ErrorBody { error: error_kind, message, errors })).into_response()
    }
}

impl ApiError {
    pub fn bad_request<S: Into<String>>(msg: S) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    /// Field-level failures of a request model, keyed by the JSON field name
    pub fn invalid_model(status: StatusCode, errors: &ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, failures) in errors.field_errors() {
            let key = json_field_name(&field);
            let messages = fields.entry(key.clone()).or_default();
            for failure in failures {
                messages.push(
                    failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("The {} field is invalid.", key)),
                );
            }
        }

        ApiError::Validation {
            status,
            message: "One or more validation errors occurred.".to_string(),
            errors: fields,
        }
    }

    /// Registration failures, keyed by identity error code
    pub fn identity(errors: &[IdentityError]) -> Self {
        let mut fields = FieldErrors::new();
        for failure in errors {
            fields.entry(failure.code.to_string()).or_default().push(failure.description.clone());
        }

        ApiError::Validation {
            status: StatusCode::BAD_REQUEST,
            message: "Registration failed.".to_string(),
            errors: fields,
        }
    }
}

/// `first_name` -> `FirstName`
fn json_field_name(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { message, field: Some(field) } => {
                let mut errors = FieldErrors::new();
                errors.insert(json_field_name(&field), vec![message.clone()]);
                ApiError::Validation { status: StatusCode::BAD_REQUEST, message, errors }
            }
            Error::Validation { message, field: None } => ApiError::BadRequest(message),
            Error::Serialization { source, .. } => ApiError::BadRequest(source.to_string()),
            Error::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{} with id: {} doesn't exist.", resource_type, id))
            }
            Error::Auth { message, error_type: AuthErrorType::InsufficientPermissions } => {
                ApiError::Forbidden(message)
            }
            Error::Auth { message, .. } => ApiError::Unauthorized(message),
            other => {
                error!(error = %other, "request failed with internal error");
                ApiError::Internal(INTERNAL_MESSAGE.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingBearer
            | AuthError::MalformedBearer
            | AuthError::InvalidToken
            | AuthError::ExpiredToken => ApiError::Unauthorized(err.to_string()),
            AuthError::Forbidden => ApiError::Forbidden(err.to_string()),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Rejected(errors) => ApiError::identity(&errors),
            RegistrationError::Persistence(inner) => inner.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::Validation {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message: e.body_text(),
                errors: FieldErrors::new(),
            },
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}
