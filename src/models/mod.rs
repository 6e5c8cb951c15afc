//! Model handles shared by the innovation generator and the concept ranker.
//!
//! Both capabilities sit behind small traits so the request-path code never
//! depends on candle directly, and tests can script the model output.

use candle_core::Device;
use std::sync::Arc;

use crate::config::{GenerationConfig, ModelBackend};
use crate::error::Result;

pub mod clip;
pub mod gpt2;
pub mod loader;
pub mod offline;

pub use loader::load_models;

/// A text-generation pipeline: prompt in, full generated sequences out
pub trait TextGenerator: Send + Sync {
    /// Returns `params.num_return_sequences` texts, each including the prompt.
    /// `seed` drives the sampler so identical seeds reproduce identical text.
    fn generate(&self, prompt: &str, params: &GenerationConfig, seed: u64) -> Result<Vec<String>>;

    fn name(&self) -> &str;
}

/// An image/text joint-embedding model paired with its preprocessor
pub trait ConceptScorer: Send + Sync {
    /// Raw image-to-text logits, one per label, in label order
    fn logits_per_image(&self, image: &[u8], labels: &[&str]) -> Result<Vec<f32>>;

    fn name(&self) -> &str;
}

/// Immutable bundle created once at startup and shared read-only afterwards
#[derive(Clone)]
pub struct ModelHandles {
    pub text: Arc<dyn TextGenerator>,
    pub concepts: Arc<dyn ConceptScorer>,
    pub generation: GenerationConfig,
    pub backend: ModelBackend,
    pub device: String,
}

impl ModelHandles {
    /// Bundle the two capabilities; the device defaults to CPU
    pub fn new(
        text: Arc<dyn TextGenerator>,
        concepts: Arc<dyn ConceptScorer>,
        generation: GenerationConfig,
        backend: ModelBackend,
    ) -> Self {
        Self {
            text,
            concepts,
            generation,
            backend,
            device: "cpu".to_string(),
        }
    }

    pub fn on_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }
}

impl std::fmt::Debug for ModelHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandles")
            .field("text", &self.text.name())
            .field("concepts", &self.concepts.name())
            .field("backend", &self.backend)
            .field("device", &self.device)
            .finish()
    }
}

/// Pick the execution device once; CPU unless an accelerator is compiled in and usable.
pub fn select_device(use_gpu: bool) -> Device {
    if use_gpu && let Some(device) = accelerated_device() {
        return device;
    }
    Device::Cpu
}

pub fn describe_device(device: &Device) -> &'static str {
    if device.is_cuda() {
        "cuda"
    } else if device.is_metal() {
        "metal"
    } else {
        "cpu"
    }
}

#[cfg(feature = "cuda")]
fn accelerated_device() -> Option<Device> {
    match Device::new_cuda(0) {
        Ok(device) => Some(device),
        Err(e) => {
            tracing::warn!("CUDA not available, defaulting to CPU: {}", e);
            None
        }
    }
}

#[cfg(all(feature = "metal", not(feature = "cuda")))]
fn accelerated_device() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => Some(device),
        Err(e) => {
            tracing::warn!("Metal not available, defaulting to CPU: {}", e);
            None
        }
    }
}

#[cfg(not(any(feature = "cuda", feature = "metal")))]
fn accelerated_device() -> Option<Device> {
    None
}
