// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages.
///
/// Authentication rejections are modeled as distinct variants so the
/// middleware can tell callers whether a refresh is worth attempting:
/// an expired credential gets its own label, everything else that fails
/// verification is a generic invalid credential. All authentication
/// failures are 401; only a resolved identity lacking the required role
/// is 403.
#[derive(Debug)]
pub enum ApiError {
    // 401 Unauthorized - authentication class
    NoCredential,
    ExpiredCredential,
    InvalidCredential(String),
    UnknownSubject,
    Unauthorized(String),

    // 403 Forbidden - authorization class
    InsufficientRole(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoCredential
            | ApiError::ExpiredCredential
            | ApiError::InvalidCredential(_)
            | ApiError::UnknownSubject
            | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InsufficientRole(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short machine-checkable label for the `error` field of the response body
    pub fn label(&self) -> &'static str {
        match self {
            ApiError::NoCredential => "Access denied",
            ApiError::ExpiredCredential => "Token expired",
            ApiError::InvalidCredential(_) => "Invalid token",
            ApiError::UnknownSubject => "Access denied",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::InsufficientRole(_) => "Forbidden",
            ApiError::BadRequest(_) => "Bad request",
            ApiError::NotFound(_) => "Not found",
            ApiError::Conflict(_) => "Conflict",
            ApiError::InternalServerError(_) => "Internal server error",
            ApiError::ServiceUnavailable(_) => "Service unavailable",
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> String {
        match self {
            ApiError::NoCredential => "No token provided".to_string(),
            ApiError::ExpiredCredential => "Access token has expired".to_string(),
            ApiError::InvalidCredential(msg) => msg.clone(),
            ApiError::UnknownSubject => "User not found".to_string(),
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::InsufficientRole(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => msg.clone(),
            ApiError::ServiceUnavailable(msg) => msg.clone(),
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": self.label(),
            "message": self.message(),
        })
    }
}

// Static constructor methods for the free-form variants
impl ApiError {
    pub fn invalid_credential(message: impl Into<String>) -> Self {
        ApiError::InvalidCredential(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn insufficient_role(message: impl Into<String>) -> Self {
        ApiError::InsufficientRole(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        match err {
            crate::store::StoreError::NotFound => ApiError::not_found("Record not found"),
            crate::store::StoreError::DuplicateUsername => {
                ApiError::conflict("Username is already taken")
            }
            crate::store::StoreError::Corrupt(msg) => {
                tracing::error!("Corrupt store record: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            crate::store::StoreError::Database(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
