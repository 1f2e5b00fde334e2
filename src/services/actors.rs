//! Actor catalog service and show cast management

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::pagination::{Page, PageLimits, PageRequest, SortSpec};
use super::validation;
use crate::db::{
    ActorFilter, ActorRecord, ActorSortKey, CreateActor, CreditRecord, Database, UpdateActor,
    UpsertCastLink,
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActorSummary {
    pub id: Uuid,
    pub name: String,
    pub country: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
}

impl From<ActorRecord> for ActorSummary {
    fn from(r: ActorRecord) -> Self {
        Self {
            id: r.id,
            name: r.name,
            country: r.country,
            birthday: r.birthday,
            gender: r.gender,
            image_url: r.image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credit {
    pub show_id: Uuid,
    pub title: String,
    pub image_url: Option<String>,
    pub premiered: Option<String>,
    pub character: Option<String>,
    pub featured: bool,
}

impl From<CreditRecord> for Credit {
    fn from(r: CreditRecord) -> Self {
        Self {
            show_id: r.show_id,
            title: r.title,
            image_url: r.image_url,
            premiered: r.premiered,
            character: r.character_name,
            featured: r.featured,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActorDetail {
    #[serde(flatten)]
    pub actor: ActorSummary,
    pub credits: Vec<Credit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorInput {
    pub name: String,
    pub country: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActorInput {
    pub name: Option<String>,
    pub country: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub gender: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastLinkInput {
    pub character: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub billing_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ActorListParams {
    pub filter: ActorFilter,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

pub struct ActorService {
    db: Database,
    limits: PageLimits,
}

impl ActorService {
    pub fn new(db: Database, limits: PageLimits) -> Self {
        Self { db, limits }
    }

    pub async fn list(&self, params: ActorListParams) -> AppResult<Page<ActorSummary>> {
        let request = PageRequest::resolve(params.page, params.page_size, self.limits);
        let sort = SortSpec::<ActorSortKey>::resolve(
            params.sort_by.as_deref(),
            params.sort_order.as_deref(),
        );

        let (records, total) = self
            .db
            .actors()
            .list_paginated(&params.filter, request, sort)
            .await?;

        Ok(Page::new(
            records.into_iter().map(ActorSummary::from).collect(),
            request,
            total,
        ))
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ActorDetail> {
        let record = self
            .db
            .actors()
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Actor", id))?;
        let credits = self.db.cast().list_for_actor(id).await?;

        Ok(ActorDetail {
            actor: ActorSummary::from(record),
            credits: credits.into_iter().map(Credit::from).collect(),
        })
    }

    pub async fn create(&self, input: ActorInput) -> AppResult<ActorSummary> {
        let record = self
            .db
            .actors()
            .create(CreateActor {
                name: validation::required_text("name", &input.name)?,
                country: validation::optional_text(input.country),
                birthday: input.birthday,
                gender: validation::optional_text(input.gender),
                image_url: validation::optional_text(input.image_url),
            })
            .await?;

        info!(actor_id = %record.id, name = %record.name, "Created actor");
        Ok(ActorSummary::from(record))
    }

    pub async fn update(&self, id: Uuid, input: UpdateActorInput) -> AppResult<ActorSummary> {
        let name = match input.name {
            Some(name) => Some(validation::required_text("name", &name)?),
            None => None,
        };

        let record = self
            .db
            .actors()
            .update(
                id,
                UpdateActor {
                    name,
                    country: validation::optional_text(input.country),
                    birthday: input.birthday,
                    gender: validation::optional_text(input.gender),
                    image_url: validation::optional_text(input.image_url),
                },
            )
            .await?
            .ok_or_else(|| AppError::not_found("Actor", id))?;

        Ok(ActorSummary::from(record))
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.db.actors().delete(id).await? {
            return Err(AppError::not_found("Actor", id));
        }
        info!(actor_id = %id, "Deleted actor");
        Ok(())
    }

    /// Add an actor to a show's cast, or update the existing link
    pub async fn add_cast(
        &self,
        show_id: Uuid,
        actor_id: Uuid,
        input: CastLinkInput,
    ) -> AppResult<()> {
        if !self.db.tv_shows().exists(show_id).await? {
            return Err(AppError::not_found("Show", show_id));
        }
        if self.db.actors().get_by_id(actor_id).await?.is_none() {
            return Err(AppError::not_found("Actor", actor_id));
        }
        if input.billing_order < 0 {
            return Err(AppError::InvalidInput(
                "billingOrder must not be negative".to_string(),
            ));
        }

        self.db
            .cast()
            .upsert(UpsertCastLink {
                show_id,
                actor_id,
                character_name: validation::optional_text(input.character),
                featured: input.featured,
                billing_order: input.billing_order,
            })
            .await?;
        Ok(())
    }

    pub async fn remove_cast(&self, show_id: Uuid, actor_id: Uuid) -> AppResult<()> {
        if !self.db.cast().remove(show_id, actor_id).await? {
            return Err(AppError::NotFound(format!(
                "Actor {} is not in the cast of show {}",
                actor_id, show_id
            )));
        }
        Ok(())
    }
}
