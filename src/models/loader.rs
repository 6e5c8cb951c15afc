//! Startup model acquisition.
//!
//! Both capabilities are required before any request is served; any failure
//! here is fatal and surfaces as `InnovationError::ModelLoad`.

use anyhow::Context;
use hf_hub::{Repo, RepoType, api::sync::Api};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::clip::ClipScorer;
use super::gpt2::Gpt2Pipeline;
use super::offline::{OfflineConceptScorer, OfflineTextGenerator};
use super::{ModelHandles, describe_device, select_device};
use crate::config::{Config, ModelBackend};
use crate::error::{InnovationError, Result};

/// Load the text-generation and concept-scoring models described by `config`
pub fn load_models(config: &Config) -> Result<ModelHandles> {
    match config.models.backend {
        ModelBackend::Offline => {
            info!("Using offline model backend (deterministic, no weights)");
            Ok(ModelHandles::new(
                Arc::new(OfflineTextGenerator),
                Arc::new(OfflineConceptScorer),
                config.generation,
                ModelBackend::Offline,
            ))
        }
        ModelBackend::Candle => load_candle_models(config).map_err(|e| {
            tracing::error!("Error loading models: {:#}", e);
            InnovationError::ModelLoad {
                message: format!("{e:#}"),
            }
        }),
    }
}

fn load_candle_models(config: &Config) -> anyhow::Result<ModelHandles> {
    info!("Starting to load models...");
    let device = select_device(config.models.use_gpu);
    info!("Selected device: {}", describe_device(&device));

    let models = &config.models;
    let mut api: Option<Api> = None;

    info!("Loading text generation model ({})...", models.text_model);
    let [text_config, text_tokenizer, text_weights] = resolve_files(
        &mut api,
        models.text_model_dir.as_deref(),
        &models.text_model,
        &models.text_revision,
        ["config.json", "tokenizer.json", "model.safetensors"],
    )?;
    let text = Gpt2Pipeline::from_files(
        models.text_model.clone(),
        &text_config,
        &text_tokenizer,
        &text_weights,
        &device,
    )
    .with_context(|| format!("text model {}", models.text_model))?;
    info!("Text generation model loaded successfully.");

    info!("Loading CLIP model and processor ({})...", models.clip_model);
    let [clip_tokenizer, clip_weights] = resolve_files(
        &mut api,
        models.clip_model_dir.as_deref(),
        &models.clip_model,
        &models.clip_revision,
        ["tokenizer.json", "model.safetensors"],
    )?;
    let concepts = ClipScorer::from_files(
        models.clip_model.clone(),
        &clip_tokenizer,
        &clip_weights,
        &device,
    )
    .with_context(|| format!("CLIP model {}", models.clip_model))?;
    info!("CLIP model and processor loaded successfully.");

    info!("All models loaded successfully.");
    Ok(ModelHandles::new(
        Arc::new(text),
        Arc::new(concepts),
        config.generation,
        ModelBackend::Candle,
    )
    .on_device(describe_device(&device)))
}

/// Local directory first, else the Hugging Face hub cache (downloading on first use)
fn resolve_files<const N: usize>(
    api: &mut Option<Api>,
    local_dir: Option<&Path>,
    repo_id: &str,
    revision: &str,
    files: [&str; N],
) -> anyhow::Result<[PathBuf; N]> {
    if let Some(dir) = local_dir {
        let paths = files.map(|f| dir.join(f));
        if let Some(missing) = paths.iter().find(|p| !p.exists()) {
            anyhow::bail!("{} not found", missing.display());
        }
        return Ok(paths);
    }

    if api.is_none() {
        *api = Some(Api::new().context("Failed to initialize Hugging Face hub client")?);
    }
    let Some(api) = api.as_ref() else {
        anyhow::bail!("Hugging Face hub client unavailable");
    };
    let repo = api.repo(Repo::with_revision(
        repo_id.to_string(),
        RepoType::Model,
        revision.to_string(),
    ));

    let mut out = Vec::with_capacity(N);
    for file in files {
        let path = repo
            .get(file)
            .with_context(|| format!("Failed to fetch {file} from {repo_id}@{revision}"))?;
        out.push(path);
    }
    out.try_into()
        .map_err(|_| anyhow::anyhow!("unexpected file count for {repo_id}"))
}
