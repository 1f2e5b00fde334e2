//! Per-user favorite shows

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::{decode_err, now_iso8601, str_to_datetime, str_to_uuid, uuid_to_str};
use super::tv_shows::TvShowRecord;
use crate::services::pagination::PageRequest;

/// A favorited show together with when it was favorited
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteShowRecord {
    pub show: TvShowRecord,
    pub favorited_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for FavoriteShowRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let favorited_at: String = row.try_get("favorited_at")?;

        Ok(Self {
            show: TvShowRecord::from_row(row)?,
            favorited_at: str_to_datetime(&favorited_at).map_err(decode_err)?,
        })
    }
}

const FAVORITE_SHOW_COLUMNS: &str = "s.id, s.title, s.summary, s.show_type, s.genres, \
     s.language, s.status, s.premiered, s.network, s.runtime, s.rating, s.image_url, \
     s.created_at, s.updated_at, f.created_at AS favorited_at";

pub struct FavoritesRepository {
    pool: SqlitePool,
}

impl FavoritesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Favorite a show. Returns false if it was already a favorite.
    pub async fn add(&self, user_id: Uuid, show_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO favorites (user_id, show_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(uuid_to_str(user_id))
        .bind(uuid_to_str(show_id))
        .bind(now_iso8601())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Unfavorite a show. Returns false if it was not a favorite.
    pub async fn remove(&self, user_id: Uuid, show_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND show_id = ?")
            .bind(uuid_to_str(user_id))
            .bind(uuid_to_str(show_id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list_show_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT show_id FROM favorites WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(uuid_to_str(user_id))
        .fetch_all(&self.pool)
        .await?;

        ids.iter().map(|id| str_to_uuid(id)).collect()
    }

    /// Favorited shows, most recently favorited first
    ///
    /// Returns (records, total_count)
    pub async fn list_shows(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<FavoriteShowRecord>, u64)> {
        let user_id = uuid_to_str(user_id);
        let total = self.count_for(&user_id).await?;

        let records = sqlx::query_as::<_, FavoriteShowRecord>(&format!(
            r#"
            SELECT {}
            FROM favorites f
            JOIN tv_shows s ON s.id = f.show_id
            WHERE f.user_id = ?
            ORDER BY f.created_at DESC, f.rowid DESC
            LIMIT ? OFFSET ?
            "#,
            FAVORITE_SHOW_COLUMNS
        ))
        .bind(&user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((records, total))
    }

    /// Every favorited show, most recent first (exports and recommendations)
    pub async fn list_all_shows(&self, user_id: Uuid) -> Result<Vec<FavoriteShowRecord>> {
        let records = sqlx::query_as::<_, FavoriteShowRecord>(&format!(
            r#"
            SELECT {}
            FROM favorites f
            JOIN tv_shows s ON s.id = f.show_id
            WHERE f.user_id = ?
            ORDER BY f.created_at DESC, f.rowid DESC
            "#,
            FAVORITE_SHOW_COLUMNS
        ))
        .bind(uuid_to_str(user_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self, user_id: Uuid) -> Result<u64> {
        self.count_for(&uuid_to_str(user_id)).await
    }

    async fn count_for(&self, user_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
