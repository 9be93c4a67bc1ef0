//! Organization CRUD handlers.
//!
//! Each request works on its own repository, so staged changes never leak
//! between requests. Listing requires the `Manager` role; the route layer
//! enforces that before the handler runs.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::{error, info, instrument};

use crate::api::dto::{OrganizationDto, OrganizationForCreationDto, OrganizationForUpdateDto};
use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::AuthContext;
use crate::domain::OrganizationId;
use crate::observability::metrics;
use crate::storage::OrganizationRepository;

/// Non-UUID ids cannot name an organization, so they read as "not found".
fn parse_id(id: &str) -> Result<OrganizationId, ApiError> {
    OrganizationId::parse(id).map_err(|_| not_found(id))
}

fn not_found(id: &str) -> ApiError {
    info!("Organization with id: {} doesn't exist in the database.", id);
    ApiError::not_found(format!("Organization with id: {} doesn't exist in the database.", id))
}

#[utoipa::path(
    get,
    path = "/organizations",
    responses(
        (status = 200, description = "All organizations", body = Vec<OrganizationDto>),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 403, description = "Manager role required")
    ),
    security(("bearerAuth" = [])),
    tag = "organizations"
)]
#[instrument(skip(state, context), fields(user_name = %context.user_name))]
pub async fn list_organizations_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
) -> Result<Json<Vec<OrganizationDto>>, ApiError> {
    let mut repository = state.organization_repository();
    let organizations = repository.get_all(false).await?;

    Ok(Json(organizations.into_iter().map(OrganizationDto::from).collect()))
}

#[utoipa::path(
    get,
    path = "/organizations/{id}",
    params(("id" = String, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Organization found", body = OrganizationDto),
        (status = 404, description = "Organization not found")
    ),
    tag = "organizations"
)]
#[instrument(skip(state), fields(org_id = %id))]
pub async fn get_organization_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<OrganizationDto>, ApiError> {
    let org_id = parse_id(&id)?;

    let mut repository = state.organization_repository();
    let organization = repository.get_by_id(&org_id, false).await?.ok_or_else(|| not_found(&id))?;

    Ok(Json(organization.into()))
}

#[utoipa::path(
    post,
    path = "/organizations",
    request_body = OrganizationForCreationDto,
    responses(
        (status = 201, description = "Organization created", body = OrganizationDto,
            headers(("Location" = String, description = "URI of the new organization"))),
        (status = 400, description = "Body is null or not JSON"),
        (status = 422, description = "Invalid organization")
    ),
    tag = "organizations"
)]
#[instrument(skip(state, payload))]
pub async fn create_organization_handler(
    State(state): State<ApiState>,
    payload: Result<Json<Option<OrganizationForCreationDto>>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let Some(organization) = payload else {
        error!("OrganizationForCreationDto object sent from client is null.");
        return Err(ApiError::bad_request("OrganizationForCreationDto object is null"));
    };

    if let Err(errors) = organization.check() {
        error!("Invalid model state for the OrganizationForCreationDto object");
        return Err(ApiError::invalid_model(StatusCode::UNPROCESSABLE_ENTITY, &errors));
    }

    let mut repository = state.organization_repository();
    let created = repository.create(organization.into_organization());
    repository.save().await?;
    metrics::record_organization_mutation("create").await;

    info!(org_id = %created.id, "organization created");
    let location = format!("/organizations/{}", created.id);
    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(OrganizationDto::from(created)))
        .into_response())
}

#[utoipa::path(
    put,
    path = "/organizations/{id}",
    params(("id" = String, Path, description = "Organization ID")),
    request_body = OrganizationForUpdateDto,
    responses(
        (status = 204, description = "Organization updated"),
        (status = 400, description = "Body is null or not JSON"),
        (status = 404, description = "Organization not found"),
        (status = 422, description = "Invalid organization")
    ),
    tag = "organizations"
)]
#[instrument(skip(state, payload), fields(org_id = %id))]
pub async fn update_organization_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<Option<OrganizationForUpdateDto>>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(payload) = payload?;
    let Some(update) = payload else {
        error!("OrganizationForUpdateDto object sent from client is null.");
        return Err(ApiError::bad_request("OrganizationForUpdateDto object is null"));
    };

    if let Err(errors) = update.check() {
        error!("Invalid model state for the OrganizationForUpdateDto object");
        return Err(ApiError::invalid_model(StatusCode::UNPROCESSABLE_ENTITY, &errors));
    }

    let org_id = parse_id(&id)?;
    let mut repository = state.organization_repository();
    let mut organization =
        repository.get_by_id(&org_id, true).await?.ok_or_else(|| not_found(&id))?;

    repository.update(&mut organization, update.into_patch());
    repository.save().await?;
    metrics::record_organization_mutation("update").await;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/organizations/{id}",
    params(("id" = String, Path, description = "Organization ID")),
    responses(
        (status = 204, description = "Organization deleted"),
        (status = 404, description = "Organization not found")
    ),
    tag = "organizations"
)]
#[instrument(skip(state), fields(org_id = %id))]
pub async fn delete_organization_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let org_id = parse_id(&id)?;

    let mut repository = state.organization_repository();
    let organization = repository.get_by_id(&org_id, false).await?.ok_or_else(|| not_found(&id))?;

    repository.delete(organization);
    repository.save().await?;
    metrics::record_organization_mutation("delete").await;

    Ok(StatusCode::NO_CONTENT)
}
