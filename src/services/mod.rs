//! Business logic on top of the repositories

pub mod actors;
pub mod auth;
pub mod export;
pub mod favorites;
pub mod pagination;
pub mod recommendations;
pub mod tv_shows;
pub mod validation;

pub use actors::ActorService;
pub use auth::{AuthConfig, AuthService, AuthenticatedUser};
pub use export::ExportService;
pub use favorites::FavoritesService;
pub use recommendations::RecommendationService;
pub use tv_shows::TvShowService;
