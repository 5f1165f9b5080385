//! HTTP surface.
//!
//! Thin axum glue over [`Pipeline`]: collects multipart uploads, runs the
//! pipeline, and turns artifacts and errors into responses.

mod handlers;
mod multipart;
mod response;

pub use multipart::collect_parts;

use crate::config::Settings;
use crate::pipeline::Pipeline;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state.
pub struct AppState {
    pub pipeline: Pipeline,
    pub service_name: String,
}

impl AppState {
    pub fn new(pipeline: Pipeline, service_name: impl Into<String>) -> Self {
        Self {
            pipeline,
            service_name: service_name.into(),
        }
    }
}

/// Build the router with all endpoints.
pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/transcribe", post(handlers::transcribe))
        .route("/transcribe_to_srt", post(handlers::transcribe_to_srt))
        .route("/extract_audio", post(handlers::extract_audio))
        .route("/burn_subtitles", post(handlers::burn_subtitles))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the router from settings.
pub fn router_from_settings(settings: &Settings) -> crate::error::Result<Router> {
    let pipeline = Pipeline::from_settings(settings)?;
    let state = Arc::new(AppState::new(pipeline, &settings.server.service_name));
    Ok(create_router(state, settings.server.max_upload_bytes()))
}
