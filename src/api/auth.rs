use axum::{
    Extension, Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, LoginData, UserDto, VerifyData};
use crate::auth::Claims;

/// Identity attached to requests by `auth_middleware`, decoded from
/// the bearer token without a database round trip.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
        }
    }
}

/// Fields stay optional so a missing one reports through the response
/// envelope instead of failing JSON extraction.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects requests without a well-formed, unexpired bearer token and
/// attaches the decoded identity as a request extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_bearer_token(&headers) else {
        return Err(ApiError::unauthorized("Missing authentication token"));
    };

    let claims = state
        .shared
        .tokens
        .verify(&token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    tracing::Span::current().record("user_id", claims.sub);

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?;
    Some(token.trim().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// One constant-shaped failure message covers unknown, inactive, and
/// wrong-password cases so callers cannot probe for usernames.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginData>>, ApiError> {
    let username = payload.username.filter(|s| !s.is_empty());
    let password = payload.password.filter(|s| !s.is_empty());
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::validation("Username and password are required"));
    };

    let user = state
        .store()
        .verify_user_password(&username, &password)
        .await
        .map_err(|e| ApiError::internal(format!("Authentication error: {e}")))?
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    state
        .store()
        .touch_last_login(user.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to record login: {e}")))?;

    let token = state
        .shared
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(format!("Failed to issue token: {e}")))?;

    tracing::info!(username = %user.username, "User logged in");

    Ok(Json(ApiResponse::success_with_message(
        "Login successful",
        LoginData {
            token,
            user: UserDto::from(user),
        },
    )))
}

/// GET /auth/verify
/// Beyond the middleware's signature/expiry check, confirms the token's
/// user still exists and is active. Both failure modes report 401.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ApiResponse<VerifyData>>, ApiError> {
    let user = state
        .store()
        .get_user_by_id(auth.id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to load user: {e}")))?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    Ok(Json(ApiResponse::success(VerifyData {
        user: UserDto::from(user),
    })))
}

/// POST /auth/logout
/// Tokens are stateless; logout only acknowledges so the client can
/// discard its copy.
pub async fn logout() -> Json<ApiResponse<()>> {
    Json(ApiResponse::ack("Logged out"))
}
