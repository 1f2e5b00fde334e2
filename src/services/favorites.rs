//! Favorites service

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::pagination::{Page, PageLimits, PageRequest};
use super::tv_shows::ShowSummary;
use crate::db::{Database, FavoriteShowRecord};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteShow {
    #[serde(flatten)]
    pub show: ShowSummary,
    pub favorited_at: DateTime<Utc>,
}

impl From<FavoriteShowRecord> for FavoriteShow {
    fn from(r: FavoriteShowRecord) -> Self {
        Self {
            show: ShowSummary::from(&r.show),
            favorited_at: r.favorited_at,
        }
    }
}

pub struct FavoritesService {
    db: Database,
    limits: PageLimits,
}

impl FavoritesService {
    pub fn new(db: Database, limits: PageLimits) -> Self {
        Self { db, limits }
    }

    /// Favorite a show. Favoriting twice is not an error.
    pub async fn add(&self, user_id: Uuid, show_id: Uuid) -> AppResult<()> {
        if !self.db.tv_shows().exists(show_id).await? {
            return Err(AppError::not_found("Show", show_id));
        }
        let added = self.db.favorites().add(user_id, show_id).await?;
        debug!(user_id = %user_id, show_id = %show_id, added, "Favorite added");
        Ok(())
    }

    /// Unfavorite a show. Removing a missing favorite is not an error.
    pub async fn remove(&self, user_id: Uuid, show_id: Uuid) -> AppResult<()> {
        let removed = self.db.favorites().remove(user_id, show_id).await?;
        debug!(user_id = %user_id, show_id = %show_id, removed, "Favorite removed");
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> AppResult<Page<FavoriteShow>> {
        let request = PageRequest::resolve(page, page_size, self.limits);
        let (records, total) = self.db.favorites().list_shows(user_id, request).await?;

        Ok(Page::new(
            records.into_iter().map(FavoriteShow::from).collect(),
            request,
            total,
        ))
    }

    pub async fn ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self.db.favorites().list_show_ids(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CreateUser;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_add_list_remove() {
        let db = Database::connect_in_memory().await.unwrap();
        db.seed().await.unwrap();
        let user = db
            .users()
            .create(CreateUser {
                username: "gus".to_string(),
                email: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let shows = db.tv_shows().list_all().await.unwrap();
        let svc = FavoritesService::new(db.clone(), PageLimits::default());

        svc.add(user.id, shows[0].id).await.unwrap();
        svc.add(user.id, shows[0].id).await.unwrap();
        svc.add(user.id, shows[1].id).await.unwrap();

        let page = svc.list(user.id, None, Some(1)).await.unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items[0].show.id, shows[1].id);

        assert_matches!(
            svc.add(user.id, Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        );

        svc.remove(user.id, shows[0].id).await.unwrap();
        svc.remove(user.id, shows[0].id).await.unwrap();
        assert_eq!(svc.ids(user.id).await.unwrap(), vec![shows[1].id]);
    }
}
