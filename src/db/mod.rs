//! Database connection and operations
//!
//! Re-exports are provided for convenience, even if not all are used within the crate.

#![allow(unused_imports)]

pub mod actors;
pub mod cast;
pub mod episodes;
pub mod favorites;
pub mod seed;
pub mod sqlite_helpers;
pub mod tv_shows;
pub mod users;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tokio::sync::Mutex;
use tracing::info;

pub use actors::{
    ActorFilter, ActorRecord, ActorRepository, ActorSortKey, CreateActor, UpdateActor,
};
pub use cast::{CastMemberRecord, CastRepository, CreditRecord, UpsertCastLink};
pub use episodes::{CreateEpisode, EpisodeCounts, EpisodeRecord, EpisodeRepository};
pub use favorites::{FavoriteShowRecord, FavoritesRepository};
pub use seed::SeedResult;
pub use tv_shows::{
    CreateTvShow, ShowSortKey, TvShowFilter, TvShowRecord, TvShowRepository, UpdateTvShow,
};
pub use users::{
    CreateUser, DELETED_USERNAME_PREFIX, ROLE_ADMIN, ROLE_MEMBER, RefreshTokenRecord, UserRecord,
    UsersRepository,
};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    seed_lock: Arc<Mutex<()>>,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            seed_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Open (creating if missing) a SQLite database
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("Invalid database URL: {}", url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        if let Some(parent) = options.get_filename().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect_with(options)
            .await?;

        info!(url = %url, max_connections, "Connected to database");
        Ok(Self::new(pool))
    }

    /// Private in-memory database with migrations applied.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool is
    /// pinned to a single connection that never expires.
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self::new(pool);
        db.migrate().await?;
        Ok(db)
    }

    /// Apply embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Populate empty catalog tables from the embedded fixtures
    pub async fn seed(&self) -> Result<SeedResult> {
        seed::run_seeds(&self.pool, &self.seed_lock).await
    }

    /// Cheap connectivity check for readiness probes
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get a TV show repository
    pub fn tv_shows(&self) -> TvShowRepository {
        TvShowRepository::new(self.pool.clone())
    }

    /// Get an episode repository
    pub fn episodes(&self) -> EpisodeRepository {
        EpisodeRepository::new(self.pool.clone())
    }

    /// Get an actor repository
    pub fn actors(&self) -> ActorRepository {
        ActorRepository::new(self.pool.clone())
    }

    /// Get a cast repository
    pub fn cast(&self) -> CastRepository {
        CastRepository::new(self.pool.clone())
    }

    /// Get a users repository
    pub fn users(&self) -> UsersRepository {
        UsersRepository::new(self.pool.clone())
    }

    /// Get a favorites repository
    pub fn favorites(&self) -> FavoritesRepository {
        FavoritesRepository::new(self.pool.clone())
    }
}
