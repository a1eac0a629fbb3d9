pub mod accounts;
pub mod auth;
pub mod config;
pub mod error;
pub mod notify;
pub mod validation;

use std::sync::Arc;

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::Json,
    routing::get,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use accounts::{AccountStatus, AccountView, CreateAccountRequest, UpdateAccountRequest};
use auth::{
    models::{LoginRequest, RegisterRequest, RegisterResponse, Role, TokenResponse},
    AuthContext, AuthService, RequireRoles,
};
use error::ErrorBody;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::register_handler,
        auth::handlers::verify_email_handler,
        auth::handlers::login_handler,
        auth::handlers::me_handler,
        accounts::handlers::list_accounts_handler,
        accounts::handlers::create_account_handler,
        accounts::handlers::get_account_handler,
        accounts::handlers::update_account_handler,
        accounts::handlers::delete_account_handler,
    ),
    components(
        schemas(
            RegisterRequest, LoginRequest, RegisterResponse, TokenResponse, AuthContext,
            AccountView, AccountStatus, Role, CreateAccountRequest, UpdateAccountRequest,
            ErrorBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, email verification and login"),
        (name = "users", description = "Account administration (SuperAdmin and Admin only)")
    ),
    info(
        title = "Identity Gate API",
        version = "0.1.0",
        description = "JWT authentication and role-based authorization for accounts"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

impl AppState {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }
}

async fn ping() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Creates and configures the application router
///
/// Protected routes run the authentication gate first, then the role gate.
/// With `route_layer` the layer added last runs first.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let any_role = RequireRoles::any_authenticated();
    let me = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route_layer(middleware::from_fn(move |req: Request, next: Next| {
            any_role.middleware(req, next)
        }))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    let administrators = RequireRoles::administrators();
    let users = Router::new()
        .route(
            "/users",
            get(accounts::handlers::list_accounts_handler)
                .post(accounts::handlers::create_account_handler),
        )
        .route(
            "/users/:id",
            get(accounts::handlers::get_account_handler)
                .patch(accounts::handlers::update_account_handler)
                .delete(accounts::handlers::delete_account_handler),
        )
        .route_layer(middleware::from_fn(move |req: Request, next: Next| {
            administrators.middleware(req, next)
        }))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::authenticate,
        ));

    Router::new()
        .route("/ping", get(ping))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/verify-email", get(auth::verify_email_handler))
        .route("/auth/login", post(auth::login_handler))
        .merge(me)
        .merge(users)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
