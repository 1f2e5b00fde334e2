//! REST API route definitions
//!
//! Everything except the health probes is nested under `/api`. Extractor
//! failures (bad JSON, query strings or path ids) are reported with the same
//! `{"error": ...}` body as service errors.

pub mod account;
pub mod actors;
pub mod auth;
pub mod favorites;
pub mod health;
pub mod recommendations;
pub mod shows;

use axum::Router;
use axum::extract::FromRequest;
use axum::extract::FromRequestParts;

use crate::AppState;
use crate::error::AppError;

/// JSON body extractor with `AppError` rejections
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor with `AppError` rejections
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameter extractor with `AppError` rejections
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// All `/api` routes
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(shows::router())
        .merge(actors::router())
        .merge(favorites::router())
        .merge(recommendations::router())
        .merge(account::router())
}
