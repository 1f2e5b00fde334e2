//! Account data export and anonymization

use anyhow::Context;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::auth::UserProfile;
use crate::db::Database;
use crate::error::{AppError, AppResult};

const CSV_HEADER: [&str; 6] = ["title", "type", "genres", "rating", "premiered", "favorited_at"];

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFavorite {
    pub show_id: Uuid,
    pub title: String,
    pub premiered: Option<NaiveDate>,
    pub favorited_at: DateTime<Utc>,
}

/// Everything the service stores about a user
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountExport {
    pub exported_at: DateTime<Utc>,
    pub profile: UserProfile,
    pub favorites: Vec<ExportedFavorite>,
}

pub struct ExportService {
    db: Database,
}

impl ExportService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Favorites as CSV, most recently favorited first
    pub async fn favorites_csv(&self, user_id: Uuid) -> AppResult<String> {
        let favorites = self.db.favorites().list_all_shows(user_id).await?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(CSV_HEADER)
            .context("Failed to write CSV header")?;

        for favorite in &favorites {
            let show = &favorite.show;
            writer
                .write_record([
                    show.title.clone(),
                    show.show_type.clone().unwrap_or_default(),
                    show.genres.join("|"),
                    show.rating.map(|r| r.to_string()).unwrap_or_default(),
                    show.premiered.map(|d| d.to_string()).unwrap_or_default(),
                    favorite
                        .favorited_at
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                ])
                .context("Failed to write CSV row")?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
        Ok(String::from_utf8(bytes).context("CSV output was not UTF-8")?)
    }

    /// Personal data export (no password hash)
    pub async fn export_account(&self, user_id: Uuid) -> AppResult<AccountExport> {
        let user = self
            .db
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        let favorites = self.db.favorites().list_all_shows(user_id).await?;

        Ok(AccountExport {
            exported_at: Utc::now(),
            profile: UserProfile::from(&user),
            favorites: favorites
                .into_iter()
                .map(|f| ExportedFavorite {
                    show_id: f.show.id,
                    title: f.show.title,
                    premiered: f.show.premiered,
                    favorited_at: f.favorited_at,
                })
                .collect(),
        })
    }

    /// Scrub the account's personal data and deactivate it
    pub async fn anonymize(&self, user_id: Uuid) -> AppResult<()> {
        if !self.db.users().anonymize(user_id).await? {
            return Err(AppError::not_found("User", user_id));
        }
        info!(user_id = %user_id, "Account anonymized");
        Ok(())
    }
}
