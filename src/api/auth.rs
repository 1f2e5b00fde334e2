//! Authentication endpoints and request guards

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Deserialize;

use super::ApiJson;
use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::services::AuthenticatedUser;
use crate::services::auth::{AuthTokens, LoginResult, RegisterInput, UserProfile};

// ============================================================================
// Guards
// ============================================================================

/// A signed-in, active user
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = state.auth.validate_access_token(bearer.token())?;
        // Role and status come from the database so demotions and
        // anonymization take effect before the token expires
        let user = state.auth.active_user(claims.id).await?;

        Ok(AuthUser(AuthenticatedUser {
            id: user.id,
            username: user.username,
            role: user.role,
        }))
    }
}

/// A signed-in admin
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email
    #[serde(alias = "email", alias = "login")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

async fn register(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> AppResult<(StatusCode, Json<LoginResult>)> {
    let result = state.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResult>> {
    Ok(Json(state.auth.login(&input.username, &input.password).await?))
}

async fn refresh(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RefreshRequest>,
) -> AppResult<Json<AuthTokens>> {
    Ok(Json(state.auth.refresh(&input.refresh_token).await?))
}

async fn logout(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RefreshRequest>,
) -> AppResult<StatusCode> {
    state.auth.logout(&input.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(state): State<AppState>, AuthUser(user): AuthUser) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.auth.me(user.id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}
