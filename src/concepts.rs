//! Image concept ranker: zero-shot scores over a fixed concept vocabulary.

use candle_core::{Device, Tensor};
use serde::Serialize;
use std::cmp::Ordering;

use crate::error::{InnovationError, Result};
use crate::models::ModelHandles;

/// Vocabulary scored against every image, in tie-break order
pub const CONCEPTS: [&str; 10] = [
    "healthcare",
    "education",
    "sustainability",
    "robotics",
    "smart agriculture",
    "business innovation",
    "AI assistants",
    "wearable technology",
    "gaming",
    "urban development",
];

/// Number of ranked concepts exposed to callers
pub const TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptScore {
    pub concept: &'static str,
    pub probability: f32,
}

/// Score all concepts against `image`, most probable first.
pub fn rank_concepts(models: &ModelHandles, image: &[u8]) -> Result<Vec<ConceptScore>> {
    let logits = models
        .concepts
        .logits_per_image(image, &CONCEPTS)
        .map_err(as_image_failure)?;
    if logits.len() != CONCEPTS.len() {
        return Err(InnovationError::ImageAnalysis {
            message: format!(
                "expected {} logits from {}, got {}",
                CONCEPTS.len(),
                models.concepts.name(),
                logits.len()
            ),
        });
    }

    let probs = softmax(&logits).map_err(as_image_failure)?;
    let mut scores: Vec<ConceptScore> = CONCEPTS
        .iter()
        .zip(probs)
        .map(|(&concept, probability)| ConceptScore {
            concept,
            probability,
        })
        .collect();
    // sort_by is stable: equal probabilities keep vocabulary order
    scores.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
    });
    Ok(scores)
}

/// The `TOP_K` most likely concepts for `image`
pub fn top_concepts(models: &ModelHandles, image: &[u8]) -> Result<Vec<ConceptScore>> {
    let mut scores = rank_concepts(models, image)?;
    scores.truncate(TOP_K);
    Ok(scores)
}

fn softmax(logits: &[f32]) -> Result<Vec<f32>> {
    let t = Tensor::new(logits, &Device::Cpu)?;
    Ok(candle_nn::ops::softmax(&t, 0)?.to_vec1::<f32>()?)
}

fn as_image_failure(err: InnovationError) -> InnovationError {
    match err {
        InnovationError::ImageAnalysis { .. } => err,
        other => InnovationError::ImageAnalysis {
            message: other.to_string(),
        },
    }
}
