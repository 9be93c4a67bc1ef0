//! Student login and registration handlers.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use tracing::{error, instrument, warn};
use validator::Validate;

use crate::api::dto::{StudentForAuthenticationDto, StudentForRegistrationDto, TokenResponse};
use crate::api::error::ApiError;
use crate::api::routes::ApiState;

#[utoipa::path(
    post,
    path = "/authentication/login",
    request_body = StudentForAuthenticationDto,
    responses(
        (status = 200, description = "Credentials accepted", body = TokenResponse),
        (status = 400, description = "User name or password missing"),
        (status = 401, description = "Wrong user name or password")
    ),
    tag = "authentication"
)]
#[instrument(skip(state, payload))]
pub async fn login_handler(
    State(state): State<ApiState>,
    payload: Result<Json<Option<StudentForAuthenticationDto>>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(payload) = payload?;
    let credentials = payload
        .ok_or_else(|| ApiError::bad_request("StudentForAuthenticationDto object is null"))?;

    credentials
        .validate()
        .map_err(|errors| ApiError::invalid_model(StatusCode::BAD_REQUEST, &errors))?;

    let mut manager = state.authentication_manager();
    if !manager.validate_student(&credentials).await? {
        warn!("Authentication failed. Wrong user name or password.");
        return Err(ApiError::unauthorized("Unauthorized"));
    }

    let token = manager.create_token().await?;
    Ok(Json(TokenResponse { token }))
}

#[utoipa::path(
    post,
    path = "/authentication/register",
    request_body = StudentForRegistrationDto,
    responses(
        (status = 201, description = "Student registered"),
        (status = 400, description = "Invalid payload or identity errors keyed by code")
    ),
    tag = "authentication"
)]
#[instrument(skip(state, payload))]
pub async fn register_handler(
    State(state): State<ApiState>,
    payload: Result<Json<Option<StudentForRegistrationDto>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;
    let registration = payload
        .ok_or_else(|| ApiError::bad_request("StudentForRegistrationDto object is null"))?;

    if let Err(errors) = registration.validate() {
        error!("Invalid model state for the StudentForRegistrationDto object");
        return Err(ApiError::invalid_model(StatusCode::BAD_REQUEST, &errors));
    }

    state.registration_service().register(registration).await?;
    Ok(StatusCode::CREATED)
}
