// HTTP handlers for account administration (/users)
// Every route here sits behind the authentication gate and the administrators role gate

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::accounts::models::{AccountStatus, AccountView, CreateAccountRequest, UpdateAccountRequest};
use crate::auth::{models::Role, service::AccountChanges, AuthContext};
use crate::error::{ApiError, AppJson};
use crate::AppState;

fn parse_role(role: Option<&str>) -> Result<Option<Role>, ApiError> {
    role.map(str::parse::<Role>)
        .transpose()
        .map_err(ApiError::Validation)
}

/// List all accounts
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All accounts", body = Vec<AccountView>),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody),
        (status = 403, description = "Caller is not an administrator", body = crate::error::ErrorBody, example = json!({"error": "Insufficient permissions. Required roles: SuperAdmin, Admin"}))
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_accounts_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AccountView>>, ApiError> {
    let accounts = state.auth.list_accounts().await?;
    tracing::debug!("Listing {} accounts", accounts.len());
    Ok(Json(accounts))
}

/// Create an active account with a chosen role
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountView),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody, example = json!({"error": "Invalid role. Valid roles: SuperAdmin, Admin, User"})),
        (status = 403, description = "Caller is not an administrator", body = crate::error::ErrorBody),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_account_handler(
    State(state): State<AppState>,
    caller: AuthContext,
    AppJson(payload): AppJson<CreateAccountRequest>,
) -> Result<(StatusCode, Json<AccountView>), ApiError> {
    payload.validate()?;
    let role = parse_role(payload.role.as_deref())?.unwrap_or_default();

    tracing::debug!("Account {} creating account with role {}", caller.account_id, role);
    let account = state
        .auth
        .create_account_as_admin(&payload.email, &payload.password, role)
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// Fetch one account
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account found", body = AccountView),
        (status = 404, description = "Account not found", body = crate::error::ErrorBody, example = json!({"error": "Account 7 not found"}))
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_account_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AccountView>, ApiError> {
    Ok(Json(state.auth.get_account(&id).await?))
}

/// Change role, status or password; omitted fields are kept
#[utoipa::path(
    patch,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "Account ID")
    ),
    request_body = UpdateAccountRequest,
    responses(
        (status = 200, description = "Account updated", body = AccountView),
        (status = 400, description = "Invalid input", body = crate::error::ErrorBody),
        (status = 404, description = "Account not found", body = crate::error::ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_account_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<UpdateAccountRequest>,
) -> Result<Json<AccountView>, ApiError> {
    payload.validate()?;

    let changes = AccountChanges {
        password: payload.password,
        role: parse_role(payload.role.as_deref())?,
        status: payload
            .status
            .as_deref()
            .map(str::parse::<AccountStatus>)
            .transpose()
            .map_err(ApiError::Validation)?,
    };

    Ok(Json(state.auth.update_account(&id, changes).await?))
}

/// Delete an account
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(
        ("id" = String, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account deleted, empty object returned"),
        (status = 404, description = "Account not found", body = crate::error::ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_account_handler(
    State(state): State<AppState>,
    caller: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.auth.delete_account(&id).await?;
    tracing::info!("Account {} deleted by {}", id, caller.account_id);
    Ok(Json(json!({})))
}
