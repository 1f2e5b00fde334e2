//! Actor database repository

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::sqlite_helpers::{
    contains_pattern, date_to_str, decode_err, now_iso8601, str_to_date_opt, str_to_datetime,
    str_to_uuid, uuid_to_str,
};
use super::tv_shows::FilterArg;
use crate::services::pagination::{PageRequest, SortKey, SortSpec};

/// Actor record from database
#[derive(Debug, Clone, PartialEq)]
pub struct ActorRecord {
    pub id: Uuid,
    pub name: String,
    pub country: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for ActorRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id: String = row.try_get("id")?;
        let birthday: Option<String> = row.try_get("birthday")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Self {
            id: str_to_uuid(&id).map_err(decode_err)?,
            name: row.try_get("name")?,
            country: row.try_get("country")?,
            birthday: str_to_date_opt(birthday.as_deref()).map_err(decode_err)?,
            gender: row.try_get("gender")?,
            image_url: row.try_get("image_url")?,
            created_at: str_to_datetime(&created_at).map_err(decode_err)?,
            updated_at: str_to_datetime(&updated_at).map_err(decode_err)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateActor {
    pub name: String,
    pub country: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
}

/// `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateActor {
    pub name: Option<String>,
    pub country: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ActorFilter {
    /// Case-insensitive name substring
    pub q: Option<String>,
    pub country: Option<String>,
    pub gender: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorSortKey {
    Name,
    Birthday,
    Country,
}

impl SortKey for ActorSortKey {
    const DEFAULT: Self = ActorSortKey::Name;

    fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(ActorSortKey::Name),
            "birthday" => Some(ActorSortKey::Birthday),
            "country" => Some(ActorSortKey::Country),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            ActorSortKey::Name => "name COLLATE NOCASE",
            ActorSortKey::Birthday => "birthday",
            ActorSortKey::Country => "country COLLATE NOCASE",
        }
    }
}

const ACTOR_COLUMNS: &str =
    "a.id, a.name, a.country, a.birthday, a.gender, a.image_url, a.created_at, a.updated_at";

pub struct ActorRepository {
    pool: SqlitePool,
}

impl ActorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List actors with filtering, sorting and pagination
    ///
    /// Returns (records, total_count)
    pub async fn list_paginated(
        &self,
        filter: &ActorFilter,
        page: PageRequest,
        sort: SortSpec<ActorSortKey>,
    ) -> Result<(Vec<ActorRecord>, u64)> {
        let mut conditions: Vec<String> = Vec::new();
        let mut args: Vec<FilterArg> = Vec::new();

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            conditions.push("LOWER(a.name) LIKE ? ESCAPE '\\'".to_string());
            args.push(FilterArg::Text(contains_pattern(q)));
        }
        if let Some(country) = filter.country.as_deref().filter(|c| !c.is_empty()) {
            conditions.push("LOWER(a.country) = LOWER(?)".to_string());
            args.push(FilterArg::Text(country.to_string()));
        }
        if let Some(gender) = filter.gender.as_deref().filter(|g| !g.is_empty()) {
            conditions.push("LOWER(a.gender) = LOWER(?)".to_string());
            args.push(FilterArg::Text(gender.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM actors a {}", where_clause);
        let data_query = format!(
            "SELECT {} FROM actors a {} {} LIMIT ? OFFSET ?",
            ACTOR_COLUMNS,
            where_clause,
            sort.order_by_sql("a")
        );

        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for arg in &args {
            count_builder = match arg {
                FilterArg::Text(s) => count_builder.bind(s.as_str()),
                FilterArg::Real(r) => count_builder.bind(*r),
            };
        }
        let total: i64 = count_builder.fetch_one(&self.pool).await?;

        let mut data_builder = sqlx::query_as::<_, ActorRecord>(&data_query);
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

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ActorRecord>> {
        let record = sqlx::query_as::<_, ActorRecord>(&format!(
            "SELECT {} FROM actors a WHERE a.id = ?",
            ACTOR_COLUMNS
        ))
        .bind(uuid_to_str(id))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM actors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn create(&self, input: CreateActor) -> Result<ActorRecord> {
        let id = Uuid::new_v4();
        let now = now_iso8601();

        sqlx::query(
            r#"
            INSERT INTO actors (id, name, country, birthday, gender, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid_to_str(id))
        .bind(&input.name)
        .bind(&input.country)
        .bind(input.birthday.map(date_to_str))
        .bind(&input.gender)
        .bind(&input.image_url)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to create actor"))
    }

    pub async fn update(&self, id: Uuid, input: UpdateActor) -> Result<Option<ActorRecord>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE actors
            SET name = ?, country = ?, birthday = ?, gender = ?, image_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(input.name.unwrap_or(existing.name))
        .bind(input.country.or(existing.country))
        .bind(input.birthday.or(existing.birthday).map(date_to_str))
        .bind(input.gender.or(existing.gender))
        .bind(input.image_url.or(existing.image_url))
        .bind(now_iso8601())
        .bind(uuid_to_str(id))
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await
    }

    /// Delete an actor (cast links cascade)
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM actors WHERE id = ?")
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::services::pagination::SortDirection;

    async fn seeded() -> Database {
        let db = Database::connect_in_memory().await.unwrap();
        let actors = db.actors();
        for (name, country, birthday) in [
            ("Bryan Cranston", "United States", "1956-03-07"),
            ("aaron paul", "United States", "1979-08-27"),
            ("Jared Harris", "United Kingdom", "1961-08-24"),
            ("Louis Hofmann", "Germany", "1997-06-03"),
        ] {
            actors
                .create(CreateActor {
                    name: name.to_string(),
                    country: Some(country.to_string()),
                    birthday: NaiveDate::parse_from_str(birthday, "%Y-%m-%d").ok(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let db = seeded().await;
        let filter = ActorFilter {
            country: Some("united states".to_string()),
            ..Default::default()
        };
        let (records, total) = db
            .actors()
            .list_paginated(
                &filter,
                PageRequest { page: 1, page_size: 10 },
                SortSpec::resolve(Some("nope"), Some("desc")),
            )
            .await
            .unwrap();

        assert_eq!(total, 2);
        let names: Vec<&str> = records.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["aaron paul", "Bryan Cranston"]);
    }

    #[tokio::test]
    async fn test_birthday_sort_descending_with_paging() {
        let db = seeded().await;
        let (records, total) = db
            .actors()
            .list_paginated(
                &ActorFilter::default(),
                PageRequest { page: 2, page_size: 2 },
                SortSpec {
                    key: ActorSortKey::Birthday,
                    direction: SortDirection::Desc,
                },
            )
            .await
            .unwrap();

        assert_eq!(total, 4);
        let names: Vec<&str> = records.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Jared Harris", "Bryan Cranston"]);
    }
}
