//! TV show catalog service
//!
//! Applies validation and the list pipeline (filter, sort, page) on top of
//! the repositories, and maps records to the JSON shapes served by the API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::pagination::{Page, PageLimits, PageRequest, SortSpec};
use super::validation;
use crate::db::{
    CastMemberRecord, CreateEpisode, CreateTvShow, Database, EpisodeRecord, ShowSortKey,
    TvShowFilter, TvShowRecord, UpdateTvShow,
};
use crate::error::{AppError, AppResult};

pub const DEFAULT_SUGGEST_LIMIT: u32 = 8;
pub const MAX_SUGGEST_LIMIT: u32 = 20;

// ============================================================================
// Transfer objects
// ============================================================================

/// Compact show shape used by lists, search, favorites and recommendations
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShowSummary {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    pub genres: Vec<String>,
    pub status: Option<String>,
    pub premiered: Option<NaiveDate>,
    pub network: Option<String>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
}

impl From<&TvShowRecord> for ShowSummary {
    fn from(r: &TvShowRecord) -> Self {
        Self {
            id: r.id,
            title: r.title.clone(),
            show_type: r.show_type.clone(),
            genres: r.genres.clone(),
            status: r.status.clone(),
            premiered: r.premiered,
            network: r.network.clone(),
            rating: r.rating,
            image_url: r.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CastMember {
    pub actor_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub character: Option<String>,
    pub featured: bool,
    pub billing_order: i32,
}

impl From<CastMemberRecord> for CastMember {
    fn from(r: CastMemberRecord) -> Self {
        Self {
            actor_id: r.actor_id,
            name: r.name,
            image_url: r.image_url,
            character: r.character_name,
            featured: r.featured,
            billing_order: r.billing_order,
        }
    }
}

/// Full show shape for the detail view
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShowDetail {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    pub genres: Vec<String>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub premiered: Option<NaiveDate>,
    pub network: Option<String>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    pub featured_cast: Vec<CastMember>,
    pub season_count: i64,
    pub episode_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShowDetail {
    fn from_record(r: TvShowRecord) -> Self {
        Self {
            id: r.id,
            title: r.title,
            summary: r.summary,
            show_type: r.show_type,
            genres: r.genres,
            language: r.language,
            status: r.status,
            premiered: r.premiered,
            network: r.network,
            runtime: r.runtime,
            rating: r.rating,
            image_url: r.image_url,
            featured_cast: Vec::new(),
            season_count: 0,
            episode_count: 0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: Uuid,
    pub show_id: Uuid,
    pub season: i32,
    pub number: i32,
    pub title: String,
    pub airdate: Option<NaiveDate>,
    pub runtime: Option<i32>,
    pub summary: Option<String>,
}

impl From<EpisodeRecord> for Episode {
    fn from(r: EpisodeRecord) -> Self {
        Self {
            id: r.id,
            show_id: r.show_id,
            season: r.season,
            number: r.number,
            title: r.title,
            airdate: r.airdate,
            runtime: r.runtime,
            summary: r.summary,
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowInput {
    pub title: String,
    pub summary: Option<String>,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub premiered: Option<NaiveDate>,
    pub network: Option<String>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShowInput {
    pub title: Option<String>,
    pub summary: Option<String>,
    #[serde(rename = "type")]
    pub show_type: Option<String>,
    pub genres: Option<Vec<String>>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub premiered: Option<NaiveDate>,
    pub network: Option<String>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEpisodeInput {
    pub season: i32,
    pub number: i32,
    pub title: String,
    pub airdate: Option<NaiveDate>,
    pub runtime: Option<i32>,
    pub summary: Option<String>,
}

/// Raw list parameters as received from the client
#[derive(Debug, Clone, Default)]
pub struct ShowListParams {
    pub filter: TvShowFilter,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// ============================================================================
// Service
// ============================================================================

pub struct TvShowService {
    db: Database,
    limits: PageLimits,
}

impl TvShowService {
    pub fn new(db: Database, limits: PageLimits) -> Self {
        Self { db, limits }
    }

    pub async fn list(&self, params: ShowListParams) -> AppResult<Page<ShowSummary>> {
        if let Some(min) = params.filter.min_rating
            && !min.is_finite()
        {
            return Err(AppError::InvalidInput("minRating must be a number".to_string()));
        }

        let request = PageRequest::resolve(params.page, params.page_size, self.limits);
        let sort = SortSpec::<ShowSortKey>::resolve(
            params.sort_by.as_deref(),
            params.sort_order.as_deref(),
        );

        let (records, total) = self
            .db
            .tv_shows()
            .list_paginated(&params.filter, request, sort)
            .await?;

        Ok(Page::new(
            records.iter().map(ShowSummary::from).collect(),
            request,
            total,
        ))
    }

    /// Search-as-you-type suggestions
    pub async fn suggest(&self, q: &str, limit: Option<u32>) -> AppResult<Vec<ShowSummary>> {
        let q = q.trim();
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let limit = limit
            .unwrap_or(DEFAULT_SUGGEST_LIMIT)
            .clamp(1, MAX_SUGGEST_LIMIT);

        let records = self.db.tv_shows().suggest(q, i64::from(limit)).await?;
        Ok(records.iter().map(ShowSummary::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ShowDetail> {
        let record = self
            .db
            .tv_shows()
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Show", id))?;

        let featured = self.db.cast().list_featured_for_show(id).await?;
        let counts = self.db.episodes().counts_for_show(id).await?;

        let mut detail = ShowDetail::from_record(record);
        detail.featured_cast = featured.into_iter().map(CastMember::from).collect();
        detail.season_count = counts.seasons;
        detail.episode_count = counts.episodes;
        Ok(detail)
    }

    pub async fn create(&self, input: CreateShowInput) -> AppResult<ShowDetail> {
        let create = CreateTvShow {
            title: validation::required_text("title", &input.title)?,
            summary: validation::optional_text(input.summary),
            show_type: validation::optional_text(input.show_type),
            genres: validation::genres(input.genres),
            language: validation::optional_text(input.language),
            status: validation::optional_text(input.status),
            premiered: input.premiered,
            network: validation::optional_text(input.network),
            runtime: validation::runtime(input.runtime)?,
            rating: validation::rating(input.rating)?,
            image_url: validation::optional_text(input.image_url),
        };

        let record = self.db.tv_shows().create(create).await?;
        info!(show_id = %record.id, title = %record.title, "Created show");
        Ok(ShowDetail::from_record(record))
    }

    pub async fn update(&self, id: Uuid, input: UpdateShowInput) -> AppResult<ShowDetail> {
        let title = match input.title {
            Some(title) => Some(validation::required_text("title", &title)?),
            None => None,
        };
        let update = UpdateTvShow {
            title,
            summary: validation::optional_text(input.summary),
            show_type: validation::optional_text(input.show_type),
            genres: input.genres.map(validation::genres),
            language: validation::optional_text(input.language),
            status: validation::optional_text(input.status),
            premiered: input.premiered,
            network: validation::optional_text(input.network),
            runtime: validation::runtime(input.runtime)?,
            rating: validation::rating(input.rating)?,
            image_url: validation::optional_text(input.image_url),
        };

        self.db
            .tv_shows()
            .update(id, update)
            .await?
            .ok_or_else(|| AppError::not_found("Show", id))?;

        self.get(id).await
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.db.tv_shows().delete(id).await? {
            return Err(AppError::not_found("Show", id));
        }
        info!(show_id = %id, "Deleted show");
        Ok(())
    }

    pub async fn episodes(&self, show_id: Uuid) -> AppResult<Vec<Episode>> {
        self.ensure_show(show_id).await?;
        let records = self.db.episodes().list_by_show(show_id).await?;
        Ok(records.into_iter().map(Episode::from).collect())
    }

    pub async fn create_episode(
        &self,
        show_id: Uuid,
        input: CreateEpisodeInput,
    ) -> AppResult<Episode> {
        self.ensure_show(show_id).await?;

        if input.season < 0 || input.number < 1 {
            return Err(AppError::InvalidInput(
                "season must be >= 0 and number >= 1".to_string(),
            ));
        }
        let title = validation::required_text("title", &input.title)?;
        let runtime = validation::runtime(input.runtime)?;

        let episodes = self.db.episodes();
        if episodes.slot_taken(show_id, input.season, input.number).await? {
            return Err(AppError::Conflict(format!(
                "Episode S{:02}E{:02} already exists",
                input.season, input.number
            )));
        }

        let record = episodes
            .create(CreateEpisode {
                show_id,
                season: input.season,
                number: input.number,
                title,
                airdate: input.airdate,
                runtime,
                summary: validation::optional_text(input.summary),
            })
            .await?;
        Ok(Episode::from(record))
    }

    pub async fn delete_episode(&self, id: Uuid) -> AppResult<()> {
        if !self.db.episodes().delete(id).await? {
            return Err(AppError::not_found("Episode", id));
        }
        Ok(())
    }

    /// Full cast, featured members first
    pub async fn cast(&self, show_id: Uuid) -> AppResult<Vec<CastMember>> {
        self.ensure_show(show_id).await?;
        let records = self.db.cast().list_for_show(show_id).await?;
        Ok(records.into_iter().map(CastMember::from).collect())
    }

    pub async fn genres(&self) -> AppResult<Vec<String>> {
        Ok(self.db.tv_shows().distinct_genres().await?)
    }

    async fn ensure_show(&self, id: Uuid) -> AppResult<()> {
        if !self.db.tv_shows().exists(id).await? {
            return Err(AppError::not_found("Show", id));
        }
        Ok(())
    }
}
