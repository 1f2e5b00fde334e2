//! Application state and HTTP router construction.
//!
//! Used by `main` and by the integration tests to build the Axum app.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::Config;
use crate::db::Database;
use crate::services::{
    ActorService, AuthConfig, AuthService, ExportService, FavoritesService,
    RecommendationService, TvShowService,
};

/// Shared state for HTTP handlers.
///
/// Services are cheap to build (a pool handle plus a few settings), so
/// handlers construct them per request through the accessors below.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        let auth = AuthService::new(db.clone(), AuthConfig::from(&config));
        Self {
            config: Arc::new(config),
            db,
            auth,
        }
    }

    pub fn shows(&self) -> TvShowService {
        TvShowService::new(self.db.clone(), self.config.page_limits())
    }

    pub fn actors(&self) -> ActorService {
        ActorService::new(self.db.clone(), self.config.page_limits())
    }

    pub fn favorites(&self) -> FavoritesService {
        FavoritesService::new(self.db.clone(), self.config.page_limits())
    }

    pub fn recommendations(&self) -> RecommendationService {
        RecommendationService::new(self.db.clone(), self.config.recommendation_seed)
    }

    pub fn export(&self) -> ExportService {
        ExportService::new(self.db.clone())
    }
}

/// Build the full Axum router: health probes, /api, layers, and the SPA
/// fallback. Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    let static_dir = Path::new(&state.config.static_dir);
    let spa = ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .merge(api::health::router())
        .nest("/api", api::router())
        .fallback_service(spa)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
