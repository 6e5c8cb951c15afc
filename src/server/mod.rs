//! UI controller: axum application that routes each user action to one
//! component and renders the outcome.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{InnovationError, Result};
use crate::models::ModelHandles;

pub mod api;
pub mod render;
pub mod routes;
pub mod upload;

/// Shared state for the HTTP server; read-only after startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub models: Arc<ModelHandles>,
}

impl AppState {
    pub fn new(config: Config, models: ModelHandles) -> Self {
        Self {
            config: Arc::new(config),
            models: Arc::new(models),
        }
    }

    /// Per-request random source: the configured seed, else fresh entropy
    pub fn rng(&self) -> StdRng {
        match self.config.runtime.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Run a model-bound call on the blocking pool with its own random source
    pub async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&ModelHandles, &mut StdRng) -> Result<T> + Send + 'static,
    {
        let models = self.models.clone();
        let mut rng = self.rng();
        tokio::task::spawn_blocking(move || f(&models, &mut rng)).await?
    }
}

/// The four input modes offered by the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Text,
    Image,
    Csv,
    Random,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Text, Mode::Image, Mode::Csv, Mode::Random];

    pub fn label(self) -> &'static str {
        match self {
            Mode::Text => "Text",
            Mode::Image => "Image",
            Mode::Csv => "CSV Data",
            Mode::Random => "Random Concept",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Mode::Text => "text",
            Mode::Image => "image",
            Mode::Csv => "csv",
            Mode::Random => "random",
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.runtime.max_upload_bytes;
    Router::new()
        .route("/", get(routes::index))
        .route("/generate", post(routes::generate))
        .route("/analyze/image", post(routes::analyze_image))
        .route("/analyze/csv", post(routes::analyze_csv))
        .route("/random", post(routes::random))
        .route("/api/generate", post(api::generate))
        .route("/api/image", post(api::image))
        .route("/api/csv", post(api::csv))
        .route("/api/random", get(api::random))
        .route("/health", get(api::health))
        .route("/info", get(api::info))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(state: AppState) -> Result<()> {
    let bind = state.config.runtime.http_bind;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| InnovationError::Internal {
            message: format!("Failed to bind HTTP listener on {bind}: {e}"),
        })?;

    tracing::info!("Serving innovation lab on http://{}", bind);

    axum::serve(listener, app)
        .await
        .map_err(|e| InnovationError::Internal {
            message: format!("HTTP server error: {e}"),
        })?;

    Ok(())
}
