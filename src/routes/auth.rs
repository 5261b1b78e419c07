/// Authentication routes
///
/// Signup, login and the identity echo behind the access guard.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, SignupInput};
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;

/// Signup request. Fields are optional so absence is reported as a
/// validation error rather than a deserialization failure.
#[derive(Deserialize)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Tokens returned on login
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

/// POST /signup
///
/// # Errors
/// - 400: missing or malformed fields
/// - 409: username or email already registered
/// - 500: internal error
pub async fn signup(
    form: web::Json<SignupRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_signup");

    let input = SignupInput {
        username: form.username.as_deref(),
        email: form.email.as_deref(),
        password: form.password.as_deref(),
        bio: form.bio.as_deref(),
    };

    let user = auth.signup(input).await.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(serde_json::json!({
        "message": "User registered successfully"
    })))
}

/// POST /login
///
/// # Errors
/// - 400: missing fields
/// - 401: unknown username or wrong password (indistinguishable)
/// - 500: internal error
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let tokens = auth
        .login(form.username.as_deref(), form.password.as_deref())
        .await
        .map_err(|e| {
            context.log_error(&e);
            e
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %tokens.user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token.to_string(),
        expires_in: tokens.expires_in,
        token_type: tokens.token_type.to_string(),
    }))
}

/// GET /api/user/me
///
/// Echoes the identity resolved by the access guard.
pub async fn current_user(user: web::ReqData<AuthenticatedUser>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "Authenticated successfully!",
        "user_id": user.user_id,
    }))
}
