// Error handling module for the identity service
// Maps every failure of the identity subsystem onto the HTTP error taxonomy

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::accounts::StoreError;
use crate::auth::password::PasswordError;
use crate::auth::token::TokenError;

/// Main error type for the API
/// All handlers and the auth service return Result<T, ApiError>
///
/// Client-facing messages are safe to display as-is. Internal details are
/// logged and replaced with a generic message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed input
    /// Maps to HTTP 400 Bad Request
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, invalid or expired credentials
    /// Maps to HTTP 401 Unauthorized
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    /// Maps to HTTP 403 Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Maps to HTTP 409 Conflict
    #[error("Email already registered")]
    DuplicateEmail,

    /// Maps to HTTP 404 Not Found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Hashing failure, signing misconfiguration, store failure with no fallback
    /// Maps to HTTP 500 Internal Server Error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body of every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message, safe to display
    pub error: String,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the message sent to the client
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Validation(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::DuplicateEmail => "Email already registered".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Validation(msg) | ApiError::NotFound(msg) => debug!("{}", msg),
            ApiError::Unauthorized(msg) => warn!("Unauthorized request: {}", msg),
            ApiError::Forbidden(msg) => warn!("Forbidden request: {}", msg),
            ApiError::DuplicateEmail => debug!("Duplicate email rejected"),
            ApiError::Internal(msg) => error!("Internal error: {}", msg),
        }

        let body = ErrorBody {
            error: self.client_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// JSON body extractor whose rejections are reported as `ApiError::Validation`
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        let message = match rejection {
            JsonRejection::MissingJsonContentType(_) => "Expected a JSON request body",
            JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body",
            _ => "Invalid request body",
        };
        ApiError::Validation(message.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => ApiError::DuplicateEmail,
            StoreError::NotFound(id) => ApiError::NotFound(format!("Account {} not found", id)),
            StoreError::Backend(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => ApiError::Unauthorized("Invalid or expired token".to_string()),
            TokenError::Signing(msg) => ApiError::Internal(format!("token signing failed: {}", msg)),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Convert validator errors to a single readable message
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{}: invalid value ({})", field, e.code),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");

        ApiError::Validation(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(ApiError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::DuplicateEmail.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = ApiError::Internal("argon2 exploded with hash $argon2id$...".to_string());
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_store_errors_convert() {
        let dup: ApiError = StoreError::DuplicateEmail("a@x.com".to_string()).into();
        assert!(matches!(dup, ApiError::DuplicateEmail));

        let missing: ApiError = StoreError::NotFound("7".to_string()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_json_rejections_become_validation_errors() {
        use axum::body::Body;
        use axum::http::{header, Request};

        #[derive(Debug, serde::Deserialize)]
        struct Login {
            #[allow(dead_code)]
            email: String,
            #[allow(dead_code)]
            password: String,
        }

        let request = |body: &'static str, content_type: &'static str| {
            Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap()
        };

        let missing_field = AppJson::<Login>::from_request(
            request(r#"{"email":"a@x.com"}"#, "application/json"),
            &(),
        )
        .await
        .unwrap_err();
        assert_eq!(missing_field.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(missing_field.client_message(), "Invalid request body");

        let syntax = AppJson::<Login>::from_request(request("{", "application/json"), &())
            .await
            .unwrap_err();
        assert_eq!(syntax.client_message(), "Malformed JSON in request body");

        let not_json = AppJson::<Login>::from_request(request("{}", "text/plain"), &())
            .await
            .unwrap_err();
        assert_eq!(not_json.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_invalid_token_is_unauthorized() {
        let err: ApiError = TokenError::InvalidToken.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.client_message(), "Invalid or expired token");
    }
}
