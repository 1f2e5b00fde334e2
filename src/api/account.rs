//! Account data export and deletion

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get},
};

use super::auth::AuthUser;
use crate::AppState;
use crate::error::AppResult;
use crate::services::export::AccountExport;

async fn export_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<AccountExport>> {
    Ok(Json(state.export().export_account(user.id).await?))
}

async fn favorites_csv(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<impl IntoResponse> {
    let csv = state.export().favorites_csv(user.id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"favorites.csv\"",
            ),
        ],
        csv,
    ))
}

async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<StatusCode> {
    state.export().anonymize(user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account", delete(delete_account))
        .route("/account/export", get(export_account))
        .route("/account/favorites.csv", get(favorites_csv))
}
