// HTTP handlers for authentication endpoints

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::accounts::AccountView;
use crate::auth::{
    middleware::AuthContext,
    models::{LoginRequest, RegisterRequest, RegisterResponse, TokenResponse, VerifyEmailQuery},
};
use crate::error::{ApiError, AppJson};
use crate::AppState;

/// Register a new account
/// POST /auth/register
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification email sent", body = RegisterResponse),
        (status = 400, description = "Invalid email or password", body = crate::error::ErrorBody, example = json!({"error": "Password must be at least 6 characters"})),
        (status = 409, description = "Email already registered", body = crate::error::ErrorBody, example = json!({"error": "Email already registered"}))
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.validate()?;

    let user = state.auth.register(&payload.email, &payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful. Please check your email to verify your account."
                .to_string(),
            user,
        }),
    ))
}

/// Activate an account from the emailed link
/// GET /auth/verify-email?token=...
#[utoipa::path(
    get,
    path = "/auth/verify-email",
    params(VerifyEmailQuery),
    responses(
        (status = 200, description = "Email verified, account active", body = AccountView),
        (status = 400, description = "Token missing", body = crate::error::ErrorBody, example = json!({"error": "Verification token is required"})),
        (status = 404, description = "Unknown token", body = crate::error::ErrorBody, example = json!({"error": "Invalid or expired verification token"}))
    ),
    tag = "auth"
)]
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<AccountView>, ApiError> {
    let token = query.token.unwrap_or_default();
    let account = state.auth.verify_email(&token).await?;
    Ok(Json(account))
}

/// Exchange credentials for a bearer token
/// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Malformed request", body = crate::error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody, example = json!({"error": "Invalid email or password"})),
        (status = 403, description = "Email not verified", body = crate::error::ErrorBody, example = json!({"error": "Please verify your email before logging in"}))
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate()?;

    let response = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(response))
}

/// Identity carried by the caller's bearer token
/// GET /auth/me
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current identity", body = AuthContext),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me_handler(context: AuthContext) -> Json<AuthContext> {
    Json(context)
}
