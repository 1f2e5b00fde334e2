//! Content-based show recommendations
//!
//! Preferences are derived from a user's favorites: the most frequent
//! genres and types, and a minimum rating at 80% of the average favorite
//! rating. Unseen shows matching those preferences form a candidate pool
//! (topped up with popular shows when thin) and a random sample of the pool
//! is returned. The random source is injected so results are reproducible
//! under a fixed seed.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::tv_shows::ShowSummary;
use crate::db::{Database, TvShowRecord};
use crate::error::AppResult;

pub const DEFAULT_COUNT: u32 = 10;
pub const MAX_COUNT: u32 = 50;

const MAX_PREFERRED_GENRES: usize = 3;
const MAX_PREFERRED_TYPES: usize = 2;
const THRESHOLD_FACTOR: f64 = 0.8;
const POPULAR_RATING: f64 = 7.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecommendationReason {
    /// Shares a genre with the user's favorites
    GenreMatch,
    /// Rated at or above the user's threshold
    HighlyRated,
    /// Backfilled from the globally popular shows
    Popular,
}

/// What a user's favorites say about their taste. Genres and types are
/// lowercased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    pub genres: Vec<String>,
    pub types: Vec<String>,
    pub min_rating: Option<f64>,
}

impl Preferences {
    pub fn from_favorites(favorites: &[TvShowRecord]) -> Self {
        let genres = top_by_frequency(
            favorites.iter().flat_map(|s| s.genres.iter()),
            MAX_PREFERRED_GENRES,
        );
        let types = top_by_frequency(
            favorites.iter().filter_map(|s| s.show_type.as_ref()),
            MAX_PREFERRED_TYPES,
        );

        let ratings: Vec<f64> = favorites.iter().filter_map(|s| s.rating).collect();
        let min_rating = if ratings.is_empty() {
            None
        } else {
            let avg = ratings.iter().sum::<f64>() / ratings.len() as f64;
            Some(avg * THRESHOLD_FACTOR)
        };

        Self {
            genres,
            types,
            min_rating,
        }
    }

    fn matches_genre(&self, show: &TvShowRecord) -> bool {
        show.genres
            .iter()
            .any(|g| self.genres.contains(&normalize(g)))
    }

    fn meets_threshold(&self, show: &TvShowRecord) -> bool {
        match (self.min_rating, show.rating) {
            (Some(min), Some(rating)) => rating >= min,
            _ => false,
        }
    }

    /// An untyped show, or no type preference at all, always passes
    fn accepts_type(&self, show: &TvShowRecord) -> bool {
        match &show.show_type {
            None => true,
            Some(_) if self.types.is_empty() => true,
            Some(t) => self.types.contains(&normalize(t)),
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Most frequent values (case-insensitive), ties broken alphabetically
fn top_by_frequency<'a>(values: impl Iterator<Item = &'a String>, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        let key = normalize(value);
        if !key.is_empty() {
            *counts.entry(key).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(k, _)| k).collect()
}

/// Highest rated first; unrated last; title then id break ties
fn by_rating_desc(a: &TvShowRecord, b: &TvShowRecord) -> Ordering {
    match (a.rating, b.rating) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    .then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub show: TvShowRecord,
    pub reason: RecommendationReason,
}

/// Pick up to `count` unseen shows for a user with the given favorites
pub fn recommend<R: Rng + ?Sized>(
    favorites: &[TvShowRecord],
    catalog: &[TvShowRecord],
    count: usize,
    rng: &mut R,
) -> Vec<Recommendation> {
    if count == 0 {
        return Vec::new();
    }

    let prefs = Preferences::from_favorites(favorites);
    let seen: HashSet<Uuid> = favorites.iter().map(|s| s.id).collect();
    let pool_target = count * 2;

    let mut unseen: Vec<&TvShowRecord> = catalog.iter().filter(|s| !seen.contains(&s.id)).collect();
    unseen.sort_by(|a, b| by_rating_desc(a, b));

    let candidates: Vec<Recommendation> = unseen
        .iter()
        .filter_map(|show| {
            if !prefs.accepts_type(show) {
                return None;
            }
            let reason = if prefs.matches_genre(show) {
                RecommendationReason::GenreMatch
            } else if prefs.meets_threshold(show) {
                RecommendationReason::HighlyRated
            } else {
                return None;
            };
            Some(Recommendation {
                show: (*show).clone(),
                reason,
            })
        })
        .collect();

    let thin = candidates.len() < count;
    let mut pool: Vec<Recommendation> = candidates.into_iter().take(pool_target).collect();

    if thin {
        let pooled: HashSet<Uuid> = pool.iter().map(|r| r.show.id).collect();
        let popular = unseen
            .iter()
            .filter(|s| !pooled.contains(&s.id))
            .filter(|s| s.rating.is_some_and(|r| r > POPULAR_RATING))
            .take(pool_target.saturating_sub(pool.len()))
            .map(|s| Recommendation {
                show: (*s).clone(),
                reason: RecommendationReason::Popular,
            });
        pool.extend(popular);
    }

    debug!(
        genres = ?prefs.genres,
        types = ?prefs.types,
        min_rating = ?prefs.min_rating,
        pool = pool.len(),
        "Built recommendation pool"
    );

    let mut picked: Vec<Recommendation> = pool.choose_multiple(rng, count).cloned().collect();
    picked.sort_by(|a, b| by_rating_desc(&a.show, &b.show));
    picked
}

// ============================================================================
// Service
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedShow {
    #[serde(flatten)]
    pub show: ShowSummary,
    pub reason: RecommendationReason,
}

pub struct RecommendationService {
    db: Database,
    seed: Option<u64>,
}

impl RecommendationService {
    pub fn new(db: Database, seed: Option<u64>) -> Self {
        Self { db, seed }
    }

    pub async fn recommend(
        &self,
        user_id: Uuid,
        count: Option<u32>,
    ) -> AppResult<Vec<RecommendedShow>> {
        let count = count.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT) as usize;

        let favorites: Vec<TvShowRecord> = self
            .db
            .favorites()
            .list_all_shows(user_id)
            .await?
            .into_iter()
            .map(|f| f.show)
            .collect();
        let catalog = self.db.tv_shows().list_all().await?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(recommend(&favorites, &catalog, count, &mut rng)
            .into_iter()
            .map(|r| RecommendedShow {
                show: ShowSummary::from(&r.show),
                reason: r.reason,
            })
            .collect())
    }
}
