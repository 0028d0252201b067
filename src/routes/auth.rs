/// Authentication Routes
///
/// Thin HTTP layer over `AuthService`: deserialize, delegate, serialize.
/// Handlers are generic over the store so tests can run them in memory.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::Claims;
use crate::error::{AuthError, ErrorContext};
use crate::service::AuthService;
use crate::store::Store;

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh and logout request
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Deserialize)]
pub struct RecoverPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// User information response
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// POST /auth/register
///
/// # Errors
/// - 400: Validation errors (invalid email/username/password)
/// - 409: Email already registered
pub async fn register<S: Store>(
    form: web::Json<RegisterRequest>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("user_registration");
    let tokens = service
        .register(&form.email, &form.username, &form.password)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::debug!(request_id = %context.request_id, operation = context.operation, "Request completed");
    Ok(HttpResponse::Created().json(tokens))
}

/// POST /auth/login
///
/// # Errors
/// - 400: Validation error (invalid email format)
/// - 401: Invalid credentials (email not found or wrong password)
pub async fn login<S: Store>(
    form: web::Json<LoginRequest>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("user_login");
    let tokens = service
        .login(&form.email, &form.password)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::debug!(request_id = %context.request_id, operation = context.operation, "Request completed");
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/refresh
///
/// # Errors
/// - 401: Unknown, expired, revoked or reused refresh token
pub async fn refresh<S: Store>(
    form: web::Json<RefreshRequest>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("token_refresh");
    let tokens = service
        .refresh_token(&form.refresh_token)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::debug!(request_id = %context.request_id, operation = context.operation, "Request completed");
    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/logout
///
/// Always 204 for a well-formed body; unknown tokens are ignored.
pub async fn logout<S: Store>(
    form: web::Json<RefreshRequest>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    service.logout(&form.refresh_token).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /auth/recover-password
///
/// Same response whether or not the email is registered.
pub async fn recover_password<S: Store>(
    form: web::Json<RecoverPasswordRequest>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("password_recovery");
    service
        .forgot_password(&form.email)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "If the email exists, a recovery link has been sent.",
    }))
}

/// POST /auth/reset-password
///
/// # Errors
/// - 400: New password fails validation
/// - 401: Invalid, expired or already used reset token
pub async fn reset_password<S: Store>(
    form: web::Json<ResetPasswordRequest>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    let context = ErrorContext::new("password_reset");
    service
        .reset_password(&form.token, &form.new_password)
        .await
        .map_err(|e| context.log_error(e))?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Password updated successfully",
    }))
}

/// GET /api/me
///
/// **Requires valid JWT access token**; claims are injected by `JwtMiddleware`.
pub async fn get_current_user<S: Store>(
    claims: web::ReqData<Claims>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    let user_id = claims.user_id()?;
    let user = service.current_user(user_id).await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.id.to_string(),
        email: user.email,
        username: user.username,
        created_at: user.created_at.to_rfc3339(),
    }))
}

/// POST /api/logout-all
///
/// Revokes every refresh token of the authenticated user.
pub async fn logout_all<S: Store>(
    claims: web::ReqData<Claims>,
    service: web::Data<AuthService<S>>,
) -> Result<HttpResponse, AuthError> {
    let user_id = claims.user_id()?;
    service.logout_all(user_id).await?;

    Ok(HttpResponse::NoContent().finish())
}
