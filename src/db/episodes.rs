//! Episode database repository

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::{
    date_to_str, decode_err, now_iso8601, str_to_date_opt, str_to_uuid, uuid_to_str,
};

/// Episode record from database
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    pub id: Uuid,
    pub show_id: Uuid,
    pub season: i32,
    pub number: i32,
    pub title: String,
    pub airdate: Option<NaiveDate>,
    pub runtime: Option<i32>,
    pub summary: Option<String>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for EpisodeRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id: String = row.try_get("id")?;
        let show_id: String = row.try_get("show_id")?;
        let airdate: Option<String> = row.try_get("airdate")?;

        Ok(Self {
            id: str_to_uuid(&id).map_err(decode_err)?,
            show_id: str_to_uuid(&show_id).map_err(decode_err)?,
            season: row.try_get("season")?,
            number: row.try_get("number")?,
            title: row.try_get("title")?,
            airdate: str_to_date_opt(airdate.as_deref()).map_err(decode_err)?,
            runtime: row.try_get("runtime")?,
            summary: row.try_get("summary")?,
        })
    }
}

/// Input for creating an episode
#[derive(Debug, Clone)]
pub struct CreateEpisode {
    pub show_id: Uuid,
    pub season: i32,
    pub number: i32,
    pub title: String,
    pub airdate: Option<NaiveDate>,
    pub runtime: Option<i32>,
    pub summary: Option<String>,
}

/// Season/episode totals for a show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpisodeCounts {
    pub seasons: i64,
    pub episodes: i64,
}

pub struct EpisodeRepository {
    pool: SqlitePool,
}

impl EpisodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get all episodes of a show in broadcast order
    pub async fn list_by_show(&self, show_id: Uuid) -> Result<Vec<EpisodeRecord>> {
        let records = sqlx::query_as::<_, EpisodeRecord>(
            r#"
            SELECT id, show_id, season, number, title, airdate, runtime, summary
            FROM episodes
            WHERE show_id = ?
            ORDER BY season, number
            "#,
        )
        .bind(uuid_to_str(show_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn counts_for_show(&self, show_id: Uuid) -> Result<EpisodeCounts> {
        let (seasons, episodes): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(DISTINCT season), COUNT(*) FROM episodes WHERE show_id = ?",
        )
        .bind(uuid_to_str(show_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(EpisodeCounts { seasons, episodes })
    }

    /// Check whether a season/number slot is already taken
    pub async fn slot_taken(&self, show_id: Uuid, season: i32, number: i32) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM episodes WHERE show_id = ? AND season = ? AND number = ?",
        )
        .bind(uuid_to_str(show_id))
        .bind(season)
        .bind(number)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<EpisodeRecord>> {
        let record = sqlx::query_as::<_, EpisodeRecord>(
            r#"
            SELECT id, show_id, season, number, title, airdate, runtime, summary
            FROM episodes
            WHERE id = ?
            "#,
        )
        .bind(uuid_to_str(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn create(&self, input: CreateEpisode) -> Result<EpisodeRecord> {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO episodes (id, show_id, season, number, title, airdate, runtime, summary, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_to_str(id))
        .bind(uuid_to_str(input.show_id))
        .bind(input.season)
        .bind(input.number)
        .bind(&input.title)
        .bind(input.airdate.map(date_to_str))
        .bind(input.runtime)
        .bind(&input.summary)
        .bind(now_iso8601())
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create episode"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM episodes WHERE id = ?")
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CreateTvShow, Database};

    #[tokio::test]
    async fn test_episodes_are_ordered_and_counted() {
        let db = Database::connect_in_memory().await.unwrap();
        let show = db
            .tv_shows()
            .create(CreateTvShow {
                title: "Fargo".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let episodes = db.episodes();
        for (season, number) in [(2, 1), (1, 2), (1, 1)] {
            episodes
                .create(CreateEpisode {
                    show_id: show.id,
                    season,
                    number,
                    title: format!("S{}E{}", season, number),
                    airdate: None,
                    runtime: Some(60),
                    summary: None,
                })
                .await
                .unwrap();
        }

        let listed = episodes.list_by_show(show.id).await.unwrap();
        let order: Vec<(i32, i32)> = listed.iter().map(|e| (e.season, e.number)).collect();
        assert_eq!(order, vec![(1, 1), (1, 2), (2, 1)]);

        let counts = episodes.counts_for_show(show.id).await.unwrap();
        assert_eq!(counts, EpisodeCounts { seasons: 2, episodes: 3 });
        assert!(episodes.slot_taken(show.id, 1, 2).await.unwrap());
        assert!(!episodes.slot_taken(show.id, 3, 1).await.unwrap());

        // Deleting the show cascades to its episodes
        db.tv_shows().delete(show.id).await.unwrap();
        assert!(episodes.list_by_show(show.id).await.unwrap().is_empty());
    }
}
