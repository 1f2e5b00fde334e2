//! Application configuration management

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use rand::{Rng, distributions::Alphanumeric};

use crate::services::pagination::PageLimits;

/// Console log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// SQLite database URL (`sqlite://path` or `sqlite::memory:`)
    pub database_url: String,

    /// Maximum pooled connections
    pub database_max_connections: u32,

    /// JWT secret for signing and verifying tokens
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub access_token_lifetime: i64,

    /// Refresh token lifetime in seconds
    pub refresh_token_lifetime: i64,

    /// Bcrypt cost factor
    pub bcrypt_cost: u32,

    /// Directory holding the built frontend
    pub static_dir: String,

    /// Populate empty catalog tables with fixture data at startup
    pub seed_on_startup: bool,

    /// Page size used when the client does not ask for one
    pub default_page_size: u32,

    /// Upper bound on client-requested page sizes
    pub max_page_size: u32,

    /// Fixed seed for recommendation sampling (random when unset)
    pub recommendation_seed: Option<u64>,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Prefer DATABASE_PATH, fall back to DATABASE_URL
        let database_url = match lookup("DATABASE_PATH") {
            Some(path) => format!("sqlite://{}", path),
            None => lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://./data/showcase.db".to_string()),
        };

        let jwt_secret = match lookup("JWT_SECRET") {
            Some(secret) if !secret.trim().is_empty() => secret.trim().to_string(),
            _ => generate_dev_secret(),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        };

        let default_page_size = parse_or(&lookup, "DEFAULT_PAGE_SIZE", 20u32)?;
        let max_page_size = parse_or(&lookup, "MAX_PAGE_SIZE", 100u32)?;
        if default_page_size == 0 || max_page_size == 0 {
            anyhow::bail!("DEFAULT_PAGE_SIZE and MAX_PAGE_SIZE must be positive");
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 3001)?,
            database_url,
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret,
            access_token_lifetime: parse_or(&lookup, "ACCESS_TOKEN_LIFETIME", 15 * 60)?,
            refresh_token_lifetime: parse_or(
                &lookup,
                "REFRESH_TOKEN_LIFETIME",
                7 * 24 * 60 * 60,
            )?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| "./static".to_string()),
            seed_on_startup: lookup("SEED_ON_STARTUP")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            default_page_size: default_page_size.min(max_page_size),
            max_page_size,
            recommendation_seed: lookup("RECOMMENDATION_SEED")
                .map(|v| v.trim().parse::<u64>().context("Invalid RECOMMENDATION_SEED"))
                .transpose()?,
            log_format,
        })
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}

pub const DEV_SECRET_PREFIX: &str = "dev-secret-";

/// Random per-process secret; tokens do not survive a restart
fn generate_dev_secret() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("{}{}", DEV_SECRET_PREFIX, suffix)
}
