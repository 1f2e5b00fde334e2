//! Personalized recommendations

use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;

use super::ApiQuery;
use super::auth::AuthUser;
use crate::AppState;
use crate::error::AppResult;
use crate::services::recommendations::RecommendedShow;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub count: Option<u32>,
}

async fn recommendations(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<RecommendationQuery>,
) -> AppResult<Json<Vec<RecommendedShow>>> {
    Ok(Json(
        state
            .recommendations()
            .recommend(user.id, query.count)
            .await?,
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/recommendations", get(recommendations))
}
