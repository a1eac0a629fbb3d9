// Authentication and role-gate middleware for protected routes

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::auth::models::{Role, RoleSet};
use crate::error::ApiError;
use crate::AppState;

/// Identity of the caller, taken from a verified bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthContext {
    pub account_id: String,
    pub email: String,
    pub role: Role,
}

fn bearer_token(request: &Request<Body>) -> Result<&str, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))?;

    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))
}

/// Authentication gate
///
/// Verifies the bearer token and stores an [`AuthContext`] in the request
/// extensions for the role gate and the handlers.
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let endpoint = request.uri().path().to_string();

    let token = bearer_token(&request).map_err(|e| {
        warn!("Rejected unauthenticated request to {}", endpoint);
        e
    })?;

    let claims = state.auth.token_service().verify(token).map_err(|e| {
        warn!("Rejected invalid bearer token for {}", endpoint);
        ApiError::from(e)
    })?;

    debug!(
        "Authenticated account {} with role {} for {}",
        claims.sub, claims.role, endpoint
    );
    request.extensions_mut().insert(AuthContext {
        account_id: claims.sub,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Role gate: the caller's role must be in the accepted set
///
/// Must be layered inside [`authenticate`]. A request reaching the gate
/// without an [`AuthContext`] is rejected as unauthenticated.
#[derive(Debug, Clone, Copy)]
pub struct RequireRoles {
    accepted: RoleSet,
}

impl RequireRoles {
    pub fn new(accepted: RoleSet) -> Self {
        Self { accepted }
    }

    /// Accept SuperAdmin and Admin
    pub fn administrators() -> Self {
        Self::new(RoleSet::administrators())
    }

    /// Accept every role; still requires authentication
    pub fn any_authenticated() -> Self {
        Self::new(RoleSet::any())
    }

    pub fn check(&self, context: Option<&AuthContext>) -> Result<(), ApiError> {
        let context = context.ok_or_else(|| {
            warn!("Role gate reached without an authenticated identity");
            ApiError::Unauthorized("Authorization header required".to_string())
        })?;

        if !self.accepted.contains(context.role) {
            warn!(
                "Authorization failed: account_id={}, role={}, required_roles={}",
                context.account_id, context.role, self.accepted
            );
            return Err(ApiError::Forbidden(format!(
                "Insufficient permissions. Required roles: {}",
                self.accepted
            )));
        }

        Ok(())
    }

    /// Middleware function that validates role-based access
    pub async fn middleware(self, request: Request<Body>, next: Next) -> Result<Response, ApiError> {
        self.check(request.extensions().get::<AuthContext>())?;
        Ok(next.run(request).await)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthorized("Authorization header required".to_string()))
    }
}
