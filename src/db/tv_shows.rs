//! TV show database repository

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::{
    contains_pattern, date_to_str, decode_err, json_array_contains_sql, json_to_vec,
    now_iso8601, prefix_pattern, str_to_date_opt, str_to_datetime, str_to_uuid, uuid_to_str,
    vec_to_json,
};
use crate::services::pagination::{PageRequest, SortKey, SortSpec};

/// TV show record from database
#[derive(Debug, Clone, PartialEq)]
pub struct TvShowRecord {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub show_type: Option<String>,
    pub genres: Vec<String>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub premiered: Option<NaiveDate>,
    pub network: Option<String>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for TvShowRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id: String = row.try_get("id")?;
        let genres: String = row.try_get("genres")?;
        let premiered: Option<String> = row.try_get("premiered")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self {
            id: str_to_uuid(&id).map_err(decode_err)?,
            title: row.try_get("title")?,
            summary: row.try_get("summary")?,
            show_type: row.try_get("show_type")?,
            genres: json_to_vec(&genres),
            language: row.try_get("language")?,
            status: row.try_get("status")?,
            premiered: str_to_date_opt(premiered.as_deref()).map_err(decode_err)?,
            network: row.try_get("network")?,
            runtime: row.try_get("runtime")?,
            rating: row.try_get("rating")?,
            image_url: row.try_get("image_url")?,
            created_at: str_to_datetime(&created_at).map_err(decode_err)?,
            updated_at: str_to_datetime(&updated_at).map_err(decode_err)?,
        })
    }
}

/// Input for creating a TV show
#[derive(Debug, Clone, Default)]
pub struct CreateTvShow {
    pub title: String,
    pub summary: Option<String>,
    pub show_type: Option<String>,
    pub genres: Vec<String>,
    pub language: Option<String>,
    pub status: Option<String>,
    pub premiered: Option<NaiveDate>,
    pub network: Option<String>,
    pub runtime: Option<i32>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
}

/// Input for updating a TV show. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTvShow {
    pub title: Option<String>,
    pub summary: Option<String>,
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

/// Optional predicates for listing shows, AND-combined
#[derive(Debug, Clone, Default)]
pub struct TvShowFilter {
    /// Case-insensitive title substring
    pub q: Option<String>,
    pub genre: Option<String>,
    pub show_type: Option<String>,
    pub status: Option<String>,
    pub min_rating: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowSortKey {
    Title,
    Rating,
    Premiered,
    CreatedAt,
}

impl SortKey for ShowSortKey {
    const DEFAULT: Self = ShowSortKey::Title;

    fn parse(s: &str) -> Option<Self> {
        match s {
            "title" => Some(ShowSortKey::Title),
            "rating" => Some(ShowSortKey::Rating),
            "premiered" => Some(ShowSortKey::Premiered),
            "createdAt" | "created_at" => Some(ShowSortKey::CreatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ShowSortKey::Title => "title COLLATE NOCASE",
            ShowSortKey::Rating => "rating",
            ShowSortKey::Premiered => "premiered",
            ShowSortKey::CreatedAt => "created_at",
        }
    }
}

/// Bind value for dynamically built WHERE clauses
#[derive(Debug, Clone)]
pub(crate) enum FilterArg {
    Text(String),
    Real(f64),
}

const SHOW_COLUMNS: &str = "s.id, s.title, s.summary, s.show_type, s.genres, s.language, \
     s.status, s.premiered, s.network, s.runtime, s.rating, s.image_url, s.created_at, \
     s.updated_at";

pub struct TvShowRepository {
    pool: SqlitePool,
}

impl TvShowRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List shows with filtering, sorting and pagination
    ///
    /// Returns (records, total_count)
    pub async fn list_paginated(
        &self,
        filter: &TvShowFilter,
        page: PageRequest,
        sort: SortSpec<ShowSortKey>,
    ) -> Result<(Vec<TvShowRecord>, u64)> {
        let mut conditions: Vec<String> = Vec::new();
        let mut args: Vec<FilterArg> = Vec::new();

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            conditions.push("LOWER(s.title) LIKE ? ESCAPE '\\'".to_string());
            args.push(FilterArg::Text(contains_pattern(q)));
        }
        if let Some(genre) = filter.genre.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            conditions.push(json_array_contains_sql("s.genres"));
            args.push(FilterArg::Text(genre.to_string()));
        }
        if let Some(show_type) = filter.show_type.as_deref().filter(|t| !t.is_empty()) {
            conditions.push("LOWER(s.show_type) = LOWER(?)".to_string());
            args.push(FilterArg::Text(show_type.to_string()));
        }
        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
            conditions.push("LOWER(s.status) = LOWER(?)".to_string());
            args.push(FilterArg::Text(status.to_string()));
        }
        if let Some(min_rating) = filter.min_rating {
            conditions.push("s.rating >= ?".to_string());
            args.push(FilterArg::Real(min_rating));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM tv_shows s {}", where_clause);
        let data_query = format!(
            "SELECT {} FROM tv_shows s {} {} LIMIT ? OFFSET ?",
            SHOW_COLUMNS,
            where_clause,
            sort.order_by_sql("s")
        );

        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for arg in &args {
            count_builder = match arg {
                FilterArg::Text(s) => count_builder.bind(s.as_str()),
                FilterArg::Real(r) => count_builder.bind(*r),
            };
        }
        let total: i64 = count_builder.fetch_one(&self.pool).await?;

        let mut data_builder = sqlx::query_as::<_, TvShowRecord>(&data_query);
        for arg in &args {
            data_builder = match arg {
                FilterArg::Text(s) => data_builder.bind(s.as_str()),
                FilterArg::Real(r) => data_builder.bind(*r),
            };
        }
        let records = data_builder
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((records, total.max(0) as u64))
    }

    /// Get every show (the recommender scores the whole catalog)
    pub async fn list_all(&self) -> Result<Vec<TvShowRecord>> {
        let records = sqlx::query_as::<_, TvShowRecord>(&format!(
            "SELECT {} FROM tv_shows s ORDER BY s.title COLLATE NOCASE, s.id",
            SHOW_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Title suggestions: prefix matches first, then other substring matches
    pub async fn suggest(&self, q: &str, limit: i64) -> Result<Vec<TvShowRecord>> {
        let records = sqlx::query_as::<_, TvShowRecord>(&format!(
            r#"
            SELECT {}
            FROM tv_shows s
            WHERE LOWER(s.title) LIKE ? ESCAPE '\'
            ORDER BY CASE WHEN LOWER(s.title) LIKE ? ESCAPE '\' THEN 0 ELSE 1 END,
                     s.title COLLATE NOCASE, s.id
            LIMIT ?
            "#,
            SHOW_COLUMNS
        ))
        .bind(contains_pattern(q))
        .bind(prefix_pattern(q))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get a TV show by ID
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<TvShowRecord>> {
        let record = sqlx::query_as::<_, TvShowRecord>(&format!(
            "SELECT {} FROM tv_shows s WHERE s.id = ?",
            SHOW_COLUMNS
        ))
        .bind(uuid_to_str(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tv_shows WHERE id = ?")
            .bind(uuid_to_str(id))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tv_shows")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Distinct genres across the catalog, case-insensitively
    pub async fn distinct_genres(&self) -> Result<Vec<String>> {
        let genres: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT MIN(g.value)
            FROM tv_shows s, json_each(s.genres) g
            GROUP BY g.value COLLATE NOCASE
            ORDER BY 1 COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(genres)
    }

    /// Create a new TV show
    pub async fn create(&self, input: CreateTvShow) -> Result<TvShowRecord> {
        let id = Uuid::new_v4();
        let now = now_iso8601();

        sqlx::query(
            r#"
            INSERT INTO tv_shows (
                id, title, summary, show_type, genres, language, status,
                premiered, network, runtime, rating, image_url, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_to_str(id))
        .bind(&input.title)
        .bind(&input.summary)
        .bind(&input.show_type)
        .bind(vec_to_json(&input.genres))
        .bind(&input.language)
        .bind(&input.status)
        .bind(input.premiered.map(date_to_str))
        .bind(&input.network)
        .bind(input.runtime)
        .bind(input.rating)
        .bind(&input.image_url)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create TV show"))
    }

    /// Apply a partial update, returning the updated record if it exists
    pub async fn update(&self, id: Uuid, input: UpdateTvShow) -> Result<Option<TvShowRecord>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let genres = input.genres.unwrap_or(existing.genres);
        sqlx::query(
            r#"
            UPDATE tv_shows
            SET title = ?, summary = ?, show_type = ?, genres = ?, language = ?,
                status = ?, premiered = ?, network = ?, runtime = ?, rating = ?,
                image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(input.title.unwrap_or(existing.title))
        .bind(input.summary.or(existing.summary))
        .bind(input.show_type.or(existing.show_type))
        .bind(vec_to_json(&genres))
        .bind(input.language.or(existing.language))
        .bind(input.status.or(existing.status))
        .bind(input.premiered.or(existing.premiered).map(date_to_str))
        .bind(input.network.or(existing.network))
        .bind(input.runtime.or(existing.runtime))
        .bind(input.rating.or(existing.rating))
        .bind(input.image_url.or(existing.image_url))
        .bind(now_iso8601())
        .bind(uuid_to_str(id))
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Delete a TV show (episodes, cast links and favorites cascade)
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tv_shows WHERE id = ?")
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
