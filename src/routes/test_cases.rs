use axum::{
    extract::State,
    http::{header, Method},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    models::{StoryExport, UserStory},
    services::{
        export::{
            download_filename, export_single_to_temp, export_stories_to_temp, ExportError,
            XLSX_CONTENT_TYPE,
        },
        generator::ProviderKind,
        risk::{aggregate_or_zero, RiskCounts},
        stories::{compose_story, example_stories},
        table::parse_test_cases,
    },
    AppState,
};

const DEFAULT_STORY_ID: &str = "US001";
const DEFAULT_STORY_TITLE: &str = "Custom User Story";

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/api/providers", get(list_providers))
        .route("/api/examples", get(list_examples))
        .route("/api/generate", post(generate_test_cases))
        .route("/api/generate/bulk", post(generate_bulk))
        .route("/api/export", post(export_test_cases))
        .route("/api/export/bulk", post(export_bulk))
        .layer(cors)
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    story_id: Option<String>,
    story_title: Option<String>,
    #[serde(default)]
    user_story: String,
    #[serde(default)]
    acceptance_criteria: String,
    ai_provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    success: bool,
    test_cases: String,
    parsed_cases: Vec<Map<String, Value>>,
    risk_counts: Option<RiskCounts>,
    story_id: String,
    story_title: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default)]
    test_cases: String,
    story_id: Option<String>,
    story_title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkExportStory {
    story_id: String,
    #[serde(default)]
    story_title: String,
    #[serde(default)]
    test_cases: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkExportRequest {
    stories: Vec<BulkExportStory>,
}

#[derive(Debug, Deserialize)]
pub struct BulkGenerateRequest {
    stories: Vec<UserStory>,
    ai_provider: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProvidersResponse {
    providers: Vec<ProviderKind>,
    current: ProviderKind,
}

#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    examples: Vec<UserStory>,
}

async fn list_providers(State(state): State<Arc<AppState>>) -> Json<ProvidersResponse> {
    Json(ProvidersResponse {
        providers: state.generators.providers(),
        current: state.generators.default_provider(),
    })
}

async fn list_examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: example_stories(),
    })
}

async fn generate_test_cases(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    if request.user_story.trim().is_empty() {
        return Err(AppError::InvalidInput("User story is required".to_string()));
    }

    let story_id = request.story_id.unwrap_or_else(|| DEFAULT_STORY_ID.to_string());
    let story_title = request.story_title.unwrap_or_else(|| DEFAULT_STORY_TITLE.to_string());
    let generator = state.generators.get(request.ai_provider.as_deref())?;

    let full_story = compose_story(&request.user_story, &request.acceptance_criteria);
    tracing::info!(
        "Generating test cases for {} with {}, story length: {}",
        story_id,
        generator.provider(),
        full_story.len()
    );

    let start = std::time::Instant::now();
    let test_cases = generator.generate(&full_story, &story_id).await?;
    tracing::info!("Generated {} chars in {:?}", test_cases.len(), start.elapsed());

    let parsed = parse_test_cases(&test_cases);
    let risk_counts = parsed.as_ref().map(|table| aggregate_or_zero(&story_id, table).0);

    Ok(Json(GenerateResponse {
        success: true,
        parsed_cases: parsed.map(|table| table.records()).unwrap_or_default(),
        test_cases,
        risk_counts,
        story_id,
        story_title,
        timestamp: Local::now().to_rfc3339(),
    }))
}

async fn generate_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkGenerateRequest>,
) -> Result<Response, AppError> {
    if request.stories.is_empty() {
        return Err(AppError::InvalidInput("At least one story is required".to_string()));
    }

    let generator = state.generators.get(request.ai_provider.as_deref())?;
    let total = request.stories.len();
    tracing::info!("Processing {} stories with {}", total, generator.provider());

    let mut exports = Vec::with_capacity(total);
    let mut last_error = None;
    for (i, story) in request.stories.into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(state.config.generators.request_delay).await;
        }
        tracing::info!("[{}/{}] Processing: {}", i + 1, total, story.title);

        match generator.generate(&story.story, &story.id).await {
            Ok(text) => exports.push(StoryExport::from_raw(story.id, story.title, text)),
            Err(e) => {
                tracing::warn!("Failed to generate test cases for {}: {}", story.title, e);
                last_error = Some(e);
            }
        }
    }

    if exports.is_empty() {
        return Err(last_error.map_or_else(
            || AppError::Internal("No stories were generated".to_string()),
            AppError::from,
        ));
    }

    let filename = download_filename(None, Local::now());
    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ExportError> {
        export_stories_to_temp(&exports)?.into_bytes()
    }).await??;
    Ok(workbook_response(bytes, &filename))
}

async fn export_test_cases(Json(request): Json<ExportRequest>) -> Result<Response, AppError> {
    if request.test_cases.trim().is_empty() {
        return Err(AppError::InvalidInput("Test cases are required".to_string()));
    }

    let story_id = request.story_id.unwrap_or_else(|| DEFAULT_STORY_ID.to_string());
    let story_title = request.story_title.unwrap_or_else(|| DEFAULT_STORY_TITLE.to_string());
    tracing::info!("Exporting test cases for {}: {}", story_id, story_title);

    let filename = download_filename(Some(&story_id), Local::now());
    let story = StoryExport::from_raw(story_id, story_title, request.test_cases);
    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ExportError> {
        export_single_to_temp(&story)?.into_bytes()
    }).await??;
    Ok(workbook_response(bytes, &filename))
}

async fn export_bulk(Json(request): Json<BulkExportRequest>) -> Result<Response, AppError> {
    if request.stories.is_empty() {
        return Err(AppError::InvalidInput("At least one story is required".to_string()));
    }

    let exports: Vec<StoryExport> = request
        .stories
        .into_iter()
        .map(|story| StoryExport::from_raw(story.story_id, story.story_title, story.test_cases))
        .collect();
    tracing::info!("Exporting {} stories", exports.len());

    let filename = download_filename(None, Local::now());
    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ExportError> {
        export_stories_to_temp(&exports)?.into_bytes()
    }).await??;
    Ok(workbook_response(bytes, &filename))
}

fn workbook_response(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename)),
        ],
        bytes,
    )
        .into_response()
}
