//! Showcase: a TV show catalog service with favorites and recommendations.

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use app::{AppState, build_app};
