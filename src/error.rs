//! Domain-specific error types for innovation-lab

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the innovation-lab application
#[derive(Error, Debug)]
pub enum InnovationError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Error loading models: {message}")]
    ModelLoad { message: String },

    #[error("Error generating innovation idea: {message}")]
    Generation { message: String },

    #[error("Error analyzing image: {message}")]
    ImageAnalysis { message: String },

    #[error("Error analyzing data: {message}")]
    DataAnalysis { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("{message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl InnovationError {
    pub fn validation(message: impl Into<String>) -> Self {
        InnovationError::Validation {
            message: message.into(),
        }
    }

    /// Stable label used by the JSON API and templates
    pub fn kind(&self) -> &'static str {
        match self {
            InnovationError::Config { .. } => "config",
            InnovationError::ModelLoad { .. } => "model_load",
            InnovationError::Generation { .. } => "generation",
            InnovationError::ImageAnalysis { .. } => "image_analysis",
            InnovationError::DataAnalysis { .. } => "data_analysis",
            InnovationError::Serialization { .. } => "serialization",
            InnovationError::Validation { .. } => "validation",
            InnovationError::Internal { .. } => "internal",
        }
    }

    /// Validation problems are warnings; everything else is an error.
    pub fn is_warning(&self) -> bool {
        matches!(self, InnovationError::Validation { .. })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            InnovationError::Validation { .. } => StatusCode::BAD_REQUEST,
            InnovationError::Generation { .. }
            | InnovationError::ImageAnalysis { .. }
            | InnovationError::DataAnalysis { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for InnovationError {
    fn from(err: anyhow::Error) -> Self {
        InnovationError::Internal {
            message: format!("{err:#}"),
        }
    }
}

impl From<serde_json::Error> for InnovationError {
    fn from(err: serde_json::Error) -> Self {
        InnovationError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<candle_core::Error> for InnovationError {
    fn from(err: candle_core::Error) -> Self {
        InnovationError::Internal {
            message: format!("Tensor operation failed: {}", err),
        }
    }
}

impl From<csv::Error> for InnovationError {
    fn from(err: csv::Error) -> Self {
        InnovationError::DataAnalysis {
            message: err.to_string(),
        }
    }
}

impl From<image::ImageError> for InnovationError {
    fn from(err: image::ImageError) -> Self {
        InnovationError::ImageAnalysis {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for InnovationError {
    fn from(err: tokio::task::JoinError) -> Self {
        InnovationError::Internal {
            message: format!("Inference task failed: {}", err),
        }
    }
}

/// Convert InnovationError to a JSON API response
impl IntoResponse for InnovationError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for innovation-lab operations
pub type Result<T> = std::result::Result<T, InnovationError>;
