use axum::Router;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::dto::{
    OrganizationDto, OrganizationForCreationDto, OrganizationForUpdateDto,
    StudentForAuthenticationDto, StudentForRegistrationDto, TokenResponse,
};
use crate::api::handlers::HealthResponse;

#[derive(OpenApi)]
#[openapi(
    info(title = "School API", description = "Organizations and student accounts", version = "v1"),
    paths(
        crate::api::handlers::health::health_handler,
        crate::api::handlers::authentication::login_handler,
        crate::api::handlers::authentication::register_handler,
        crate::api::handlers::organizations::list_organizations_handler,
        crate::api::handlers::organizations::get_organization_handler,
        crate::api::handlers::organizations::create_organization_handler,
        crate::api::handlers::organizations::update_organization_handler,
        crate::api::handlers::organizations::delete_organization_handler,
    ),
    components(
        schemas(
            HealthResponse,
            TokenResponse,
            StudentForAuthenticationDto,
            StudentForRegistrationDto,
            OrganizationDto,
            OrganizationForCreationDto,
            OrganizationForUpdateDto
        )
    ),
    tags(
        (name = "authentication", description = "Student login and registration"),
        (name = "organizations", description = "Organization management"),
        (name = "health", description = "Service health")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build(),
            ),
        );
    }
}

pub fn docs_router() -> Router {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let openapi = ApiDoc::openapi();
        let paths: Vec<&str> = openapi.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/health",
            "/authentication/login",
            "/authentication/register",
            "/organizations",
            "/organizations/{id}",
        ] {
            assert!(paths.contains(&expected), "missing path {}", expected);
        }
    }

    #[test]
    fn openapi_declares_bearer_scheme_and_schemas() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components");

        assert!(components.security_schemes.contains_key("bearerAuth"));
        assert!(components.schemas.contains_key("OrganizationDto"));
        assert!(components.schemas.contains_key("StudentForRegistrationDto"));
    }
}
