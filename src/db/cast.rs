//! Show cast links (actor appears in show, optionally featured)

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::{bool_to_int, decode_err, int_to_bool, str_to_uuid, uuid_to_str};

/// An actor as listed on a show's cast
#[derive(Debug, Clone, PartialEq)]
pub struct CastMemberRecord {
    pub actor_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub character_name: Option<String>,
    pub featured: bool,
    pub billing_order: i32,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for CastMemberRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let actor_id: String = row.try_get("actor_id")?;
        let featured: i32 = row.try_get("featured")?;

        Ok(Self {
            actor_id: str_to_uuid(&actor_id).map_err(decode_err)?,
            name: row.try_get("name")?,
            image_url: row.try_get("image_url")?,
            character_name: row.try_get("character_name")?,
            featured: int_to_bool(featured),
            billing_order: row.try_get("billing_order")?,
        })
    }
}

/// A show as listed in an actor's credits
#[derive(Debug, Clone, PartialEq)]
pub struct CreditRecord {
    pub show_id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub premiered: Option<String>,
    pub character_name: Option<String>,
    pub featured: bool,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for CreditRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let show_id: String = row.try_get("show_id")?;
        let featured: i32 = row.try_get("featured")?;

        Ok(Self {
            show_id: str_to_uuid(&show_id).map_err(decode_err)?,
            title: row.try_get("title")?,
            image_url: row.try_get("image_url")?,
            premiered: row.try_get("premiered")?,
            character_name: row.try_get("character_name")?,
            featured: int_to_bool(featured),
        })
    }
}

#[derive(Debug, Clone)]
pub struct UpsertCastLink {
    pub show_id: Uuid,
    pub actor_id: Uuid,
    pub character_name: Option<String>,
    pub featured: bool,
    pub billing_order: i32,
}

pub struct CastRepository {
    pool: SqlitePool,
}

impl CastRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Cast of a show, featured members first, then billing order
    pub async fn list_for_show(&self, show_id: Uuid) -> Result<Vec<CastMemberRecord>> {
        self.query_show_cast(show_id, false).await
    }

    /// Only the featured members of a show's cast
    pub async fn list_featured_for_show(&self, show_id: Uuid) -> Result<Vec<CastMemberRecord>> {
        self.query_show_cast(show_id, true).await
    }

    async fn query_show_cast(
        &self,
        show_id: Uuid,
        featured_only: bool,
    ) -> Result<Vec<CastMemberRecord>> {
        let records = sqlx::query_as::<_, CastMemberRecord>(
            r#"
            SELECT c.actor_id, a.name, a.image_url, c.character_name, c.featured, c.billing_order
            FROM show_cast c
            JOIN actors a ON a.id = c.actor_id
            WHERE c.show_id = ? AND (? = 0 OR c.featured = 1)
            ORDER BY c.featured DESC, c.billing_order, a.name COLLATE NOCASE
            "#,
        )
        .bind(uuid_to_str(show_id))
        .bind(bool_to_int(featured_only))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Shows an actor appears in, newest first
    pub async fn list_for_actor(&self, actor_id: Uuid) -> Result<Vec<CreditRecord>> {
        let records = sqlx::query_as::<_, CreditRecord>(
            r#"
            SELECT c.show_id, s.title, s.image_url, s.premiered, c.character_name, c.featured
            FROM show_cast c
            JOIN tv_shows s ON s.id = c.show_id
            WHERE c.actor_id = ?
            ORDER BY (s.premiered IS NULL), s.premiered DESC, s.title COLLATE NOCASE
            "#,
        )
        .bind(uuid_to_str(actor_id))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Insert or replace a cast link
    pub async fn upsert(&self, link: UpsertCastLink) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO show_cast (show_id, actor_id, character_name, featured, billing_order)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (show_id, actor_id) DO UPDATE SET
                character_name = excluded.character_name,
                featured = excluded.featured,
                billing_order = excluded.billing_order
            "#,
        )
        .bind(uuid_to_str(link.show_id))
        .bind(uuid_to_str(link.actor_id))
        .bind(&link.character_name)
        .bind(bool_to_int(link.featured))
        .bind(link.billing_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn remove(&self, show_id: Uuid, actor_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM show_cast WHERE show_id = ? AND actor_id = ?")
            .bind(uuid_to_str(show_id))
            .bind(uuid_to_str(actor_id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CreateActor, CreateTvShow, Database};

    #[tokio::test]
    async fn test_featured_cast_and_credits() {
        let db = Database::connect_in_memory().await.unwrap();
        let show = db
            .tv_shows()
            .create(CreateTvShow {
                title: "Breaking Bad".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let walt = db
            .actors()
            .create(CreateActor {
                name: "Bryan Cranston".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let hank = db
            .actors()
            .create(CreateActor {
                name: "Dean Norris".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let cast = db.cast();
        cast.upsert(UpsertCastLink {
            show_id: show.id,
            actor_id: hank.id,
            character_name: Some("Hank Schrader".to_string()),
            featured: false,
            billing_order: 1,
        })
        .await
        .unwrap();
        cast.upsert(UpsertCastLink {
            show_id: show.id,
            actor_id: walt.id,
            character_name: Some("Walter White".to_string()),
            featured: false,
            billing_order: 0,
        })
        .await
        .unwrap();

        // Upsert flips the featured flag in place
        cast.upsert(UpsertCastLink {
            show_id: show.id,
            actor_id: hank.id,
            character_name: Some("Hank Schrader".to_string()),
            featured: true,
            billing_order: 1,
        })
        .await
        .unwrap();

        let all = cast.list_for_show(show.id).await.unwrap();
        let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dean Norris", "Bryan Cranston"]);

        let featured = cast.list_featured_for_show(show.id).await.unwrap();
        assert_eq!(featured.len(), 1);
        assert_eq!(featured[0].character_name.as_deref(), Some("Hank Schrader"));

        let credits = cast.list_for_actor(walt.id).await.unwrap();
        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].title, "Breaking Bad");

        assert!(cast.remove(show.id, walt.id).await.unwrap());
        assert!(cast.list_for_actor(walt.id).await.unwrap().is_empty());
    }
}
