use std::sync::Arc;

use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{
    credential_store::{CredentialStore, SqlxCredentialStore},
    middleware::{authenticate, require_roles, RoleState},
    registration::{PasswordPolicy, RegistrationService},
    AuthenticationManager, Role, TokenIssuer,
};
use crate::config::{AppConfig, ServerConfig};
use crate::errors::Result;
use crate::observability::track_http_requests;
use crate::request_span;
use crate::storage::{DbPool, SqlxOrganizationRepository};

use super::{
    docs,
    handlers::{
        create_organization_handler, delete_organization_handler, get_organization_handler,
        health_handler, list_organizations_handler, login_handler, register_handler,
        update_organization_handler,
    },
};

/// Shared, read-only dependencies of every handler.
#[derive(Clone)]
pub struct ApiState {
    pub pool: DbPool,
    pub token_issuer: Arc<TokenIssuer>,
    pub config: Arc<AppConfig>,
}

impl ApiState {
    pub fn new(pool: DbPool, config: AppConfig) -> Result<Self> {
        let token_issuer = Arc::new(TokenIssuer::from_config(&config.auth)?);
        Ok(Self { pool, token_issuer, config: Arc::new(config) })
    }

    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        Arc::new(SqlxCredentialStore::with_sqlx(self.pool.clone()))
    }

    /// Fresh manager for one login attempt
    pub fn authentication_manager(&self) -> AuthenticationManager {
        AuthenticationManager::new(self.credential_store(), self.token_issuer.clone())
    }

    pub fn registration_service(&self) -> RegistrationService {
        RegistrationService::new(
            self.credential_store(),
            PasswordPolicy::from_config(&self.config.auth),
        )
    }

    /// Fresh unit of work for one request
    pub fn organization_repository(&self) -> SqlxOrganizationRepository {
        SqlxOrganizationRepository::new(self.pool.clone())
    }
}

pub fn build_router(state: ApiState) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.token_issuer.clone(), authenticate);

    let role_layer = |roles: &[Role]| {
        let required: RoleState = Arc::new(roles.iter().map(|role| role.to_string()).collect());
        middleware::from_fn_with_state(required, require_roles)
    };

    let secured_api = Router::new()
        .route("/organizations", get(list_organizations_handler))
        .route_layer(role_layer(&[Role::Manager]))
        .route_layer(auth_layer);

    let public_api = Router::new()
        .route("/authentication/login", post(login_handler))
        .route("/authentication/register", post(register_handler))
        .route("/organizations", post(create_organization_handler))
        .route(
            "/organizations/{id}",
            get(get_organization_handler)
                .put(update_organization_handler)
                .delete(delete_organization_handler),
        )
        .route("/health", get(health_handler));

    let server_config = state.config.server.clone();

    secured_api
        .merge(public_api)
        .with_state(state)
        .merge(docs::docs_router())
        .layer(middleware::from_fn(track_http_requests))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                request_span!(request.method(), request.uri().path())
            }),
        )
        .layer(cors_layer(&server_config))
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if !config.enable_cors {
        return CorsLayer::new();
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
