/// Error Handling Module
///
/// Domain errors are kept apart from the coarse outcomes callers see:
/// 1. Store and token errors carry internal detail for logging
/// 2. `AuthError` is the service boundary taxonomy
/// 3. HTTP response mapping with structured error bodies

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

pub use crate::validators::ValidationError;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Errors reported by a token/credential store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique value (email, refresh token value) already exists
    #[error("conflicting record: {0}")]
    Conflict(String),
    /// The backend could not complete the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Reasons a signed token failed validation.
///
/// These never leave the crate boundary as-is; they collapse into
/// [`AuthError::InvalidToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token was issued for a different purpose")]
    WrongPurpose,
    #[error("token is malformed")]
    Malformed,
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("failed to send email: {0}")]
    SendFailed(String),
    #[error("email service returned an error: {0}")]
    ServiceError(String),
    #[error("invalid sender address: {0}")]
    InvalidSender(String),
}

/// ============================================================================
/// 2. SERVICE BOUNDARY ERROR TYPE
/// ============================================================================

/// Outcome taxonomy visible to callers of the authentication core
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    AlreadyExists,
    /// Malformed, expired, wrong-purpose, unknown, used or reused token
    #[error("invalid or expired token")]
    InvalidToken,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("store unavailable")]
    StoreUnavailable(#[source] StoreError),
    #[error("password hashing failed: {0}")]
    HashingFailure(String),
    #[error("token issuance failed: {0}")]
    TokenIssuance(String),
}

// ============================================================================
// FROM IMPLEMENTATIONS (Control Flow Error Conversion)
// ============================================================================

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "Store operation failed");
        AuthError::StoreUnavailable(err)
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        tracing::debug!(reason = %err, "Token rejected");
        AuthError::InvalidToken
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AuthError {
    /// Status, machine code and public message for this error.
    ///
    /// Internal failures get a fixed message so store or hashing details never
    /// reach the client.
    fn public_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AuthError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid or expired token".to_string(),
            ),
            AuthError::AlreadyExists => (
                StatusCode::CONFLICT,
                "USER_ALREADY_EXISTS",
                "User with this email already exists".to_string(),
            ),
            AuthError::StoreUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable".to_string(),
            ),
            AuthError::HashingFailure(_) | AuthError::TokenIssuance(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log_error(&self, error_id: &str) {
        match self {
            AuthError::Validation(_)
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::AlreadyExists => {
                tracing::warn!(error_id = error_id, error = %self, "Request rejected");
            }
            _ => {
                tracing::error!(error_id = error_id, error = ?self, "Request failed");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        self.public_parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&error_id);

        let (status, code, message) = self.public_parts();
        HttpResponse::build(status).json(ErrorResponse::new(
            error_id,
            message,
            code.to_string(),
            status.as_u16(),
        ))
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-request context attached to log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: &'static str,
}

impl ErrorContext {
    pub fn new(operation: &'static str) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation,
        }
    }

    /// Log a failed operation under this request id.
    ///
    /// Returns the error so it can sit inside `map_err`.
    pub fn log_error(&self, error: AuthError) -> AuthError {
        match &error {
            AuthError::Validation(_)
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::AlreadyExists => {
                tracing::warn!(
                    request_id = %self.request_id,
                    operation = self.operation,
                    error = %error,
                    "Operation rejected"
                );
            }
            _ => {
                tracing::error!(
                    request_id = %self.request_id,
                    operation = self.operation,
                    error = ?error,
                    "Operation failed"
                );
            }
        }
        error
    }
}
