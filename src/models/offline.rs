//! Deterministic, weight-free model stand-ins for local development and tests.
//!
//! Selected only through `models.backend = "offline"`; never substituted for a
//! real model that failed to load.

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{ConceptScorer, TextGenerator};
use crate::config::GenerationConfig;
use crate::error::{InnovationError, Result};

const CONTINUATIONS: [&str; 4] = [
    "A pilot program pairs low-cost sensors with a shared data platform so local teams can act on problems as they emerge.",
    "A modular service kit lets small organizations adopt the solution in stages, starting with the highest-impact step.",
    "An open marketplace connects people who have the problem with makers who can prototype fixes within weeks.",
    "A community-run dashboard tracks progress in real time and rewards the neighborhoods that improve fastest.",
];

/// Echoes the prompt and appends one canned continuation chosen by the seed
#[derive(Debug, Default, Clone)]
pub struct OfflineTextGenerator;

impl TextGenerator for OfflineTextGenerator {
    fn generate(&self, prompt: &str, params: &GenerationConfig, seed: u64) -> Result<Vec<String>> {
        (0..params.num_return_sequences)
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let continuation = CONTINUATIONS.choose(&mut rng).copied().unwrap_or_default();
                Ok(format!("{prompt}\n{continuation}"))
            })
            .collect()
    }

    fn name(&self) -> &str {
        "offline-text"
    }
}

/// Scores labels from the image's mean brightness; decodes the image like the real model
#[derive(Debug, Default, Clone)]
pub struct OfflineConceptScorer;

impl ConceptScorer for OfflineConceptScorer {
    fn logits_per_image(&self, image: &[u8], labels: &[&str]) -> Result<Vec<f32>> {
        let img = image::load_from_memory(image)?.to_luma8();
        let pixels = img.as_raw();
        if pixels.is_empty() {
            return Err(InnovationError::ImageAnalysis {
                message: "image has no pixels".to_string(),
            });
        }
        let mean = pixels.iter().map(|&p| p as f32).sum::<f32>() / pixels.len() as f32 / 255.0;
        // Peak sits on the label whose index matches the brightness bucket
        let target = mean * (labels.len().saturating_sub(1)) as f32;
        Ok((0..labels.len())
            .map(|i| {
                let d = i as f32 - target;
                -(d * d) / 2.0
            })
            .collect())
    }

    fn name(&self) -> &str {
        "offline-concepts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_text_is_seed_deterministic() {
        let params = GenerationConfig::default();
        let a = OfflineTextGenerator.generate("Problem", &params, 7).unwrap();
        let b = OfflineTextGenerator.generate("Problem", &params, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
        assert!(a[0].starts_with("Problem\n"));
    }

    #[test]
    fn offline_scorer_rejects_garbage() {
        let err = OfflineConceptScorer
            .logits_per_image(b"not an image", &["a", "b"])
            .unwrap_err();
        assert!(matches!(err, InnovationError::ImageAnalysis { .. }));
    }
}
