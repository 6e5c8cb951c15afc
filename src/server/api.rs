//! JSON twins of the UI actions plus health/info endpoints.

use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
    http::{HeaderMap, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::AppState;
use super::upload::{UploadForm, UploadKind};
use crate::concepts::{ConceptScore, top_concepts};
use crate::error::{InnovationError, Result};
use crate::innovation::{Context, generate_innovation};
use crate::random_concept::{self, RandomConcept};
use crate::tabular::{TableSummary, summarize_csv};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub problem: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub context: Context,
    pub idea: String,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub concepts: Vec<ConceptScore>,
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    "ok"
}

/// Info endpoint
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    let models = &state.models;
    Json(json!({
        "models": {
            "backend": models.backend,
            "text": models.text.name(),
            "concepts": models.concepts.name(),
            "device": models.device,
        },
        "generation": models.generation,
        "server": {
            "bind": state.config.runtime.http_bind.to_string(),
            "max_upload_bytes": state.config.runtime.max_upload_bytes,
        }
    }))
}

pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    if req.problem.trim().is_empty() {
        return Err(InnovationError::validation(
            "Please enter a valid problem statement or idea.",
        ));
    }
    // The API is strict about context names; the HTML form falls back to General
    let context = match req.context.as_deref() {
        Some(c) => c.parse::<Context>()?,
        None => Context::default(),
    };
    let problem = req.problem;
    let idea = state
        .run_blocking(move |models, rng| generate_innovation(models, &problem, context.label(), rng))
        .await?;
    Ok(Json(GenerateResponse { context, idea }))
}

pub async fn image(State(state): State<AppState>, multipart: Multipart) -> Result<Json<ImageResponse>> {
    let form = UploadForm::read(multipart).await?;
    let bytes = form.require_file("image", UploadKind::Image)?.bytes.clone();
    let concepts = state
        .run_blocking(move |models, _rng| top_concepts(models, &bytes))
        .await?;
    Ok(Json(ImageResponse { concepts }))
}

/// Raw CSV request body (`text/csv`)
pub async fn csv(headers: HeaderMap, body: Bytes) -> Result<Json<TableSummary>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.is_empty() && !content_type.starts_with("text/csv") {
        return Err(InnovationError::validation(format!(
            "Expected a text/csv body, got '{content_type}'"
        )));
    }
    if body.is_empty() {
        return Err(InnovationError::validation(UploadKind::Csv.prompt()));
    }
    Ok(Json(summarize_csv(&body)?))
}

pub async fn random(State(state): State<AppState>) -> Json<&'static RandomConcept> {
    let mut rng = state.rng();
    Json(random_concept::pick(&mut rng))
}
