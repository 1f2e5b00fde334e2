//! Actor endpoints

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AdminUser;
use super::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use crate::db::ActorFilter;
use crate::error::AppResult;
use crate::services::actors::{
    ActorDetail, ActorInput, ActorListParams, ActorSummary, UpdateActorInput,
};
use crate::services::pagination::Page;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorListQuery {
    pub q: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl From<ActorListQuery> for ActorListParams {
    fn from(q: ActorListQuery) -> Self {
        Self {
            filter: ActorFilter {
                q: q.q,
                country: q.country,
                gender: q.gender,
            },
            page: q.page,
            page_size: q.page_size,
            sort_by: q.sort_by,
            sort_order: q.sort_order,
        }
    }
}

async fn list_actors(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ActorListQuery>,
) -> AppResult<Json<Page<ActorSummary>>> {
    Ok(Json(state.actors().list(query.into()).await?))
}

async fn get_actor(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ActorDetail>> {
    Ok(Json(state.actors().get(id).await?))
}

async fn create_actor(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(input): ApiJson<ActorInput>,
) -> AppResult<(StatusCode, Json<ActorSummary>)> {
    let actor = state.actors().create(input).await?;
    Ok((StatusCode::CREATED, Json(actor)))
}

async fn update_actor(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateActorInput>,
) -> AppResult<Json<ActorSummary>> {
    Ok(Json(state.actors().update(id, input).await?))
}

async fn delete_actor(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.actors().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/actors", get(list_actors).post(create_actor))
        .route(
            "/actors/{id}",
            get(get_actor).put(update_actor).delete(delete_actor),
        )
}
