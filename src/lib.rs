//! Turns generator-written test case tables into styled, multi-sheet xlsx workbooks.
//!
//! The pipeline lives in [`services`]: [`services::table`] pulls a seven-column table out
//! of free-form text, [`services::risk`] counts rows per risk bucket, and
//! [`services::excel`] with [`services::export`] lay out and persist the workbook.
//! [`routes`] exposes it over HTTP.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use services::generator::GeneratorRegistry;

// Application state
pub struct AppState {
    pub config: config::Config,
    pub generators: GeneratorRegistry,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let generators = GeneratorRegistry::from_settings(&config.generators);
        Self::with_generators(config, generators)
    }

    pub fn with_generators(config: config::Config, generators: GeneratorRegistry) -> Self {
        Self { config, generators }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .merge(routes::routes())
        .merge(routes::test_cases::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
