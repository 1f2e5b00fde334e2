//! TV show, episode and cast endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, put},
};
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AdminUser;
use super::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;
use crate::db::TvShowFilter;
use crate::error::AppResult;
use crate::services::actors::CastLinkInput;
use crate::services::pagination::Page;
use crate::services::tv_shows::{
    CastMember, CreateEpisodeInput, CreateShowInput, Episode, ShowDetail, ShowListParams,
    ShowSummary, UpdateShowInput,
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowListQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    pub status: Option<String>,
    pub min_rating: Option<f64>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl From<ShowListQuery> for ShowListParams {
    fn from(q: ShowListQuery) -> Self {
        Self {
            filter: TvShowFilter {
                q: q.q,
                genre: q.genre,
                show_type: q.show_type,
                status: q.status,
                min_rating: q.min_rating,
            },
            page: q.page,
            page_size: q.page_size,
            sort_by: q.sort_by,
            sort_order: q.sort_order,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

async fn list_shows(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ShowListQuery>,
) -> AppResult<Json<Page<ShowSummary>>> {
    Ok(Json(state.shows().list(query.into()).await?))
}

async fn search_shows(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<Json<Vec<ShowSummary>>> {
    Ok(Json(state.shows().suggest(&query.q, query.limit).await?))
}

async fn get_show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ShowDetail>> {
    Ok(Json(state.shows().get(id).await?))
}

async fn create_show(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiJson(input): ApiJson<CreateShowInput>,
) -> AppResult<(StatusCode, Json<ShowDetail>)> {
    let show = state.shows().create(input).await?;
    Ok((StatusCode::CREATED, Json(show)))
}

async fn update_show(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<UpdateShowInput>,
) -> AppResult<Json<ShowDetail>> {
    Ok(Json(state.shows().update(id, input).await?))
}

async fn delete_show(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.shows().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_episodes(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<Episode>>> {
    Ok(Json(state.shows().episodes(id).await?))
}

async fn create_episode(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CreateEpisodeInput>,
) -> AppResult<(StatusCode, Json<Episode>)> {
    let episode = state.shows().create_episode(id, input).await?;
    Ok((StatusCode::CREATED, Json(episode)))
}

async fn delete_episode(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    state.shows().delete_episode(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_cast(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Vec<CastMember>>> {
    Ok(Json(state.shows().cast(id).await?))
}

async fn put_cast_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath((show_id, actor_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<CastLinkInput>,
) -> AppResult<Json<Vec<CastMember>>> {
    state.actors().add_cast(show_id, actor_id, input).await?;
    Ok(Json(state.shows().cast(show_id).await?))
}

async fn delete_cast_member(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiPath((show_id, actor_id)): ApiPath<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    state.actors().remove_cast(show_id, actor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.shows().genres().await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shows", get(list_shows).post(create_show))
        .route("/shows/search", get(search_shows))
        .route(
            "/shows/{id}",
            get(get_show).put(update_show).delete(delete_show),
        )
        .route(
            "/shows/{id}/episodes",
            get(list_episodes).post(create_episode),
        )
        .route("/shows/{id}/cast", get(list_cast))
        .route(
            "/shows/{id}/cast/{actor_id}",
            put(put_cast_member).delete(delete_cast_member),
        )
        .route("/episodes/{id}", delete(delete_episode))
        .route("/genres", get(list_genres))
}
