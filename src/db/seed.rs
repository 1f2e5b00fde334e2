//! One-time catalog seeding.
//!
//! Populates empty catalog tables with the fixture data embedded in
//! `fixtures/catalog.json`. Each table group (shows with their episodes,
//! actors, cast links) is only seeded while it is empty, so re-runs are
//! no-ops. Callers serialize on the database's seed lock and all inserts
//! happen in a single transaction.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::sqlite_helpers::{bool_to_int, date_to_str, now_iso8601, uuid_to_str, vec_to_json};

const CATALOG_FIXTURES: &str = include_str!("fixtures/catalog.json");

/// Result of running seed operations.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedResult {
    pub tables_seeded: Vec<String>,
    pub rows_inserted: u64,
}

impl SeedResult {
    pub fn is_noop(&self) -> bool {
        self.tables_seeded.is_empty()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFixtures {
    shows: Vec<ShowFixture>,
    actors: Vec<ActorFixture>,
    cast: Vec<CastFixture>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShowFixture {
    title: String,
    summary: Option<String>,
    #[serde(rename = "type")]
    show_type: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    language: Option<String>,
    status: Option<String>,
    premiered: Option<NaiveDate>,
    network: Option<String>,
    runtime: Option<i32>,
    rating: Option<f64>,
    image_url: Option<String>,
    #[serde(default)]
    episodes: Vec<EpisodeFixture>,
}

#[derive(Debug, Deserialize)]
struct EpisodeFixture {
    season: i32,
    number: i32,
    title: String,
    airdate: Option<NaiveDate>,
    runtime: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorFixture {
    name: String,
    country: Option<String>,
    birthday: Option<NaiveDate>,
    gender: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CastFixture {
    show: String,
    actor: String,
    character: Option<String>,
    #[serde(default)]
    featured: bool,
}

/// Seed the catalog if it is empty.
///
/// The lock must be the one owned by the database handle so that concurrent
/// callers (startup plus an admin trigger, or parallel tests) cannot both
/// observe empty tables and insert twice.
pub async fn run_seeds(pool: &SqlitePool, lock: &Mutex<()>) -> Result<SeedResult> {
    let _guard = lock.lock().await;

    let fixtures: CatalogFixtures =
        serde_json::from_str(CATALOG_FIXTURES).context("Invalid catalog fixtures")?;

    let mut result = SeedResult::default();
    let mut tx = pool.begin().await?;

    if table_is_empty(&mut tx, "tv_shows").await? {
        let rows = seed_shows(&mut tx, &fixtures.shows).await?;
        result.tables_seeded.push("tv_shows".to_string());
        result.tables_seeded.push("episodes".to_string());
        result.rows_inserted += rows;
    } else {
        debug!("tv_shows not empty, skipping");
    }

    if table_is_empty(&mut tx, "actors").await? {
        let rows = seed_actors(&mut tx, &fixtures.actors).await?;
        result.tables_seeded.push("actors".to_string());
        result.rows_inserted += rows;
    } else {
        debug!("actors not empty, skipping");
    }

    if table_is_empty(&mut tx, "show_cast").await? {
        let rows = seed_cast(&mut tx, &fixtures.cast).await?;
        if rows > 0 {
            result.tables_seeded.push("show_cast".to_string());
            result.rows_inserted += rows;
        }
    } else {
        debug!("show_cast not empty, skipping");
    }

    tx.commit().await?;

    if result.is_noop() {
        debug!("Catalog already populated, nothing to seed");
    } else {
        info!(
            tables = ?result.tables_seeded,
            rows = result.rows_inserted,
            "Seeded catalog"
        );
    }

    Ok(result)
}

async fn table_is_empty(tx: &mut Transaction<'_, Sqlite>, table: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(&mut **tx)
        .await?;
    Ok(count == 0)
}

async fn seed_shows(tx: &mut Transaction<'_, Sqlite>, shows: &[ShowFixture]) -> Result<u64> {
    let mut rows = 0;

    for show in shows {
        let show_id = uuid_to_str(Uuid::new_v4());
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
        .bind(&show_id)
        .bind(&show.title)
        .bind(&show.summary)
        .bind(&show.show_type)
        .bind(vec_to_json(&show.genres))
        .bind(&show.language)
        .bind(&show.status)
        .bind(show.premiered.map(date_to_str))
        .bind(&show.network)
        .bind(show.runtime)
        .bind(show.rating)
        .bind(&show.image_url)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
        rows += 1;

        for episode in &show.episodes {
            sqlx::query(
                r#"
                INSERT INTO episodes (id, show_id, season, number, title, airdate, runtime, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(uuid_to_str(Uuid::new_v4()))
            .bind(&show_id)
            .bind(episode.season)
            .bind(episode.number)
            .bind(&episode.title)
            .bind(episode.airdate.map(date_to_str))
            .bind(episode.runtime)
            .bind(&now)
            .execute(&mut **tx)
            .await?;
            rows += 1;
        }
    }

    Ok(rows)
}

async fn seed_actors(tx: &mut Transaction<'_, Sqlite>, actors: &[ActorFixture]) -> Result<u64> {
    let mut rows = 0;

    for actor in actors {
        let now = now_iso8601();
        sqlx::query(
            r#"
            INSERT INTO actors (id, name, country, birthday, gender, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_to_str(Uuid::new_v4()))
        .bind(&actor.name)
        .bind(&actor.country)
        .bind(actor.birthday.map(date_to_str))
        .bind(&actor.gender)
        .bind(&actor.image_url)
        .bind(&now)
        .bind(&now)
        .execute(&mut **tx)
        .await?;
        rows += 1;
    }

    Ok(rows)
}

/// Cast fixtures reference shows by title and actors by name
async fn seed_cast(tx: &mut Transaction<'_, Sqlite>, cast: &[CastFixture]) -> Result<u64> {
    let mut rows = 0;
    let mut billing: std::collections::HashMap<String, i32> = std::collections::HashMap::new();

    for link in cast {
        let show_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM tv_shows WHERE title = ? COLLATE NOCASE LIMIT 1")
                .bind(&link.show)
                .fetch_optional(&mut **tx)
                .await?;
        let actor_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM actors WHERE name = ? COLLATE NOCASE LIMIT 1")
                .bind(&link.actor)
                .fetch_optional(&mut **tx)
                .await?;

        let (Some(show_id), Some(actor_id)) = (show_id, actor_id) else {
            warn!(show = %link.show, actor = %link.actor, "Skipping cast fixture with unknown show or actor");
            continue;
        };

        let order = billing.entry(show_id.clone()).or_insert(0);
        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO show_cast (show_id, actor_id, character_name, featured, billing_order)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&show_id)
        .bind(&actor_id)
        .bind(&link.character)
        .bind(bool_to_int(link.featured))
        .bind(*order)
        .execute(&mut **tx)
        .await?
        .rows_affected();
        if inserted > 0 {
            *order += 1;
            rows += inserted;
        }
    }

    Ok(rows)
}
