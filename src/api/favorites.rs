//! Favorites endpoints (signed-in users)

use axum::{Json, Router, extract::State, http::StatusCode, routing::get, routing::put};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::{ApiPath, ApiQuery};
use crate::AppState;
use crate::error::AppResult;
use crate::services::favorites::FavoriteShow;
use crate::services::pagination::Page;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list_favorites(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<Json<Page<FavoriteShow>>> {
    let page = state
        .favorites()
        .list(user.id, query.page, query.page_size)
        .await?;
    Ok(Json(page))
}

async fn favorite_ids(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<Uuid>>> {
    Ok(Json(state.favorites().ids(user.id).await?))
}

async fn add_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(show_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.favorites().add(user.id, show_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_favorite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiPath(show_id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.favorites().remove(user.id, show_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/favorites", get(list_favorites))
        .route("/favorites/ids", get(favorite_ids))
        .route(
            "/favorites/{show_id}",
            put(add_favorite).delete(remove_favorite),
        )
}
