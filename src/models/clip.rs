//! CLIP zero-shot concept scoring.
//!
//! `ClipPreprocessor` turns labels into padded token ids and image bytes into
//! a normalized pixel tensor; `ClipScorer` runs the joint model on both.

use anyhow::Context;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::clip::{ClipConfig, ClipModel};
use image::imageops::FilterType;
use std::path::Path;
use tokenizers::Tokenizer;

use super::ConceptScorer;
use crate::error::{InnovationError, Result};

// CLIP normalization constants (OpenAI image processor)
const MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

const PAD_TOKEN: &str = "<|endoftext|>";

pub struct ClipPreprocessor {
    tokenizer: Tokenizer,
    pad_id: u32,
    image_size: usize,
    device: Device,
}

impl ClipPreprocessor {
    pub fn new(tokenizer: Tokenizer, image_size: usize, device: &Device) -> anyhow::Result<Self> {
        let pad_id = *tokenizer
            .get_vocab(true)
            .get(PAD_TOKEN)
            .with_context(|| format!("tokenizer has no {PAD_TOKEN} token"))?;
        Ok(Self {
            tokenizer,
            pad_id,
            image_size,
            device: device.clone(),
        })
    }

    /// Token ids for every label, right-padded to the longest one: [n_labels, seq]
    pub fn encode_labels(&self, labels: &[&str]) -> Result<Tensor> {
        let mut ids = Vec::with_capacity(labels.len());
        for label in labels {
            let encoding = self
                .tokenizer
                .encode(*label, true)
                .map_err(|e| image_error(format!("Tokenization failed: {e}")))?;
            ids.push(encoding.get_ids().to_vec());
        }
        let max_len = ids.iter().map(Vec::len).max().unwrap_or(0);
        let flat: Vec<u32> = ids
            .into_iter()
            .flat_map(|mut seq| {
                seq.resize(max_len, self.pad_id);
                seq
            })
            .collect();
        Ok(Tensor::from_vec(flat, (labels.len(), max_len), &self.device)?)
    }

    /// Decode, resize-and-center-crop to the model size, normalize: [1, 3, H, W]
    pub fn encode_image(&self, bytes: &[u8]) -> Result<Tensor> {
        let size = self.image_size as u32;
        let img = image::load_from_memory(bytes)?
            .resize_to_fill(size, size, FilterType::CatmullRom)
            .to_rgb8();
        let pixels = Tensor::from_vec(
            img.into_raw(),
            (self.image_size, self.image_size, 3),
            &self.device,
        )?
        .permute((2, 0, 1))?
        .to_dtype(DType::F32)?
        .affine(1.0 / 255.0, 0.0)?;
        let mean = Tensor::new(&MEAN, &self.device)?.reshape((3, 1, 1))?;
        let std = Tensor::new(&STD, &self.device)?.reshape((3, 1, 1))?;
        Ok(pixels
            .broadcast_sub(&mean)?
            .broadcast_div(&std)?
            .unsqueeze(0)?)
    }
}

pub struct ClipScorer {
    model: ClipModel,
    preprocessor: ClipPreprocessor,
    name: String,
}

impl ClipScorer {
    /// ViT-B/32 weights plus the paired tokenizer
    pub fn from_files(
        name: impl Into<String>,
        tokenizer_path: &Path,
        weights_path: &Path,
        device: &Device,
    ) -> anyhow::Result<Self> {
        let config = ClipConfig::vit_base_patch32();
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        let preprocessor = ClipPreprocessor::new(tokenizer, config.image_size, device)?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)?
        };
        let model = ClipModel::new(vb, &config).context("Failed to build CLIP model")?;

        Ok(Self {
            model,
            preprocessor,
            name: name.into(),
        })
    }
}

impl ConceptScorer for ClipScorer {
    fn logits_per_image(&self, image: &[u8], labels: &[&str]) -> Result<Vec<f32>> {
        let pixel_values = self.preprocessor.encode_image(image)?;
        let input_ids = self.preprocessor.encode_labels(labels)?;
        let (_logits_per_text, logits_per_image) = self
            .model
            .forward(&pixel_values, &input_ids)
            .map_err(|e| image_error(e.to_string()))?;
        logits_per_image
            .squeeze(0)
            .and_then(|t| t.to_dtype(DType::F32))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| image_error(e.to_string()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn image_error(message: impl Into<String>) -> InnovationError {
    InnovationError::ImageAnalysis {
        message: message.into(),
    }
}
