use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{InnovationError, Result};

/// Main configuration structure loaded from innovation_lab.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub models: ModelsConfig,
    pub generation: GenerationConfig,
    /// Runtime configuration, overridable from environment variables
    pub runtime: RuntimeConfig,
}

/// Which implementation backs the model handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Pretrained weights executed with candle
    Candle,
    /// Deterministic stand-ins with no weights; for development and tests
    Offline,
}

impl std::str::FromStr for ModelBackend {
    type Err = InnovationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candle" => Ok(ModelBackend::Candle),
            "offline" => Ok(ModelBackend::Offline),
            other => Err(InnovationError::Config {
                message: format!("unknown model backend '{other}' (expected candle|offline)"),
            }),
        }
    }
}

/// Where the pretrained models come from
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub backend: ModelBackend,
    pub text_model: String,
    pub text_revision: String,
    /// Local directory with config.json, tokenizer.json and model.safetensors
    pub text_model_dir: Option<PathBuf>,
    pub clip_model: String,
    pub clip_revision: String,
    /// Local directory with tokenizer.json and model.safetensors
    pub clip_model_dir: Option<PathBuf>,
    /// Prefer CUDA/Metal when compiled in and available
    pub use_gpu: bool,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::Candle,
            text_model: "gpt2".to_string(),
            text_revision: "main".to_string(),
            text_model_dir: None,
            clip_model: "openai/clip-vit-base-patch32".to_string(),
            // The safetensors export lives on this PR ref
            clip_revision: "refs/pr/15".to_string(),
            clip_model_dir: None,
            use_gpu: true,
        }
    }
}

/// Sampling parameters handed to the text-generation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Total sequence length in tokens, prompt included
    pub max_length: usize,
    pub num_return_sequences: usize,
    pub temperature: f64,
    /// Keep only the k most likely tokens before the nucleus cut; 0 disables
    pub top_k: usize,
    pub top_p: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: 200,
            num_return_sequences: 1,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
        }
    }
}

impl GenerationConfig {
    /// Validate the sampling parameters
    pub fn validate(&self) -> Result<()> {
        if self.max_length == 0 {
            return Err(config_error("generation.max_length must be > 0"));
        }
        if self.num_return_sequences == 0 {
            return Err(config_error("generation.num_return_sequences must be >= 1"));
        }
        if !(self.temperature > 0.0) {
            return Err(config_error("generation.temperature must be > 0"));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(config_error("generation.top_p must be in (0, 1]"));
        }
        Ok(())
    }
}

/// Runtime configuration loaded from the file and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub http_bind: std::net::SocketAddr,
    pub log_level: String,
    pub max_upload_bytes: usize,
    /// Number of CSV rows echoed back in the data preview
    pub preview_rows: usize,
    /// Fixed seed for every request; fresh entropy when unset
    pub seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_bind: std::net::SocketAddr::from(([127, 0, 0, 1], 8501)),
            log_level: "innovation_lab=info,tower_http=info".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            preview_rows: 10,
            seed: None,
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses INNOVATION_LAB_CONFIG environment variable or defaults to "innovation_lab.toml"
    pub fn load() -> Result<Self> {
        // INNOV_ENV_FILE if set, else ./.env when present
        if let Ok(env_path) = std::env::var("INNOV_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let config_path = std::env::var("INNOVATION_LAB_CONFIG")
            .unwrap_or_else(|_| "innovation_lab.toml".to_string());

        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(content) => Self::from_toml(&content)?,
            Err(_) => {
                tracing::debug!("Config file {} not found, using defaults", config_path);
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| InnovationError::Config {
            message: format!("invalid config file: {e}"),
        })
    }

    /// Apply INNOV_* environment overrides (env-first)
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(backend) = env_nonempty("INNOV_MODEL_BACKEND") {
            self.models.backend = backend.parse()?;
        }
        if let Some(model) = env_nonempty("INNOV_TEXT_MODEL") {
            self.models.text_model = model;
        }
        if let Some(dir) = env_nonempty("INNOV_TEXT_MODEL_DIR") {
            self.models.text_model_dir = Some(PathBuf::from(dir));
        }
        if let Some(model) = env_nonempty("INNOV_CLIP_MODEL") {
            self.models.clip_model = model;
        }
        if let Some(rev) = env_nonempty("INNOV_CLIP_REVISION") {
            self.models.clip_revision = rev;
        }
        if let Some(dir) = env_nonempty("INNOV_CLIP_MODEL_DIR") {
            self.models.clip_model_dir = Some(PathBuf::from(dir));
        }
        if let Some(use_gpu) = env_nonempty("INNOV_USE_GPU") {
            self.models.use_gpu = use_gpu == "1" || use_gpu.eq_ignore_ascii_case("true");
        }

        if let Some(bind) = env_nonempty("INNOV_HTTP_BIND") {
            self.runtime.http_bind = bind.parse().map_err(|e| InnovationError::Config {
                message: format!("INNOV_HTTP_BIND '{bind}' is not a socket address: {e}"),
            })?;
        }
        if let Some(level) = env_nonempty("INNOV_LOG") {
            self.runtime.log_level = level;
        }
        if let Some(limit) = env_nonempty("INNOV_MAX_UPLOAD_BYTES").and_then(|v| v.parse().ok()) {
            self.runtime.max_upload_bytes = limit;
        }
        if let Some(seed) = env_nonempty("INNOV_SEED") {
            self.runtime.seed = Some(seed.parse().map_err(|e| InnovationError::Config {
                message: format!("INNOV_SEED '{seed}' is not an integer: {e}"),
            })?);
        }

        if let Some(t) = env_nonempty("INNOV_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.generation.temperature = t;
        }
        if let Some(k) = env_nonempty("INNOV_TOP_K").and_then(|v| v.parse().ok()) {
            self.generation.top_k = k;
        }
        if let Some(p) = env_nonempty("INNOV_TOP_P").and_then(|v| v.parse().ok()) {
            self.generation.top_p = p;
        }
        if let Some(len) = env_nonempty("INNOV_MAX_LENGTH").and_then(|v| v.parse().ok()) {
            self.generation.max_length = len;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.generation.validate()?;
        if self.runtime.max_upload_bytes == 0 {
            return Err(config_error("runtime.max_upload_bytes must be > 0"));
        }
        if self.models.text_model.trim().is_empty() || self.models.clip_model.trim().is_empty() {
            return Err(config_error("model identifiers must not be empty"));
        }
        Ok(())
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn config_error(message: &str) -> InnovationError {
    InnovationError::Config {
        message: message.to_string(),
    }
}
