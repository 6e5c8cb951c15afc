//! Innovation generator: structured prompt in, generated idea out.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{InnovationError, Result};
use crate::models::ModelHandles;

/// Domain context the idea should be framed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    #[default]
    General,
    Healthcare,
    Education,
    Sustainability,
    Robotics,
    Agriculture,
    Technology,
}

impl Context {
    pub const ALL: [Context; 7] = [
        Context::General,
        Context::Healthcare,
        Context::Education,
        Context::Sustainability,
        Context::Robotics,
        Context::Agriculture,
        Context::Technology,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Context::General => "General",
            Context::Healthcare => "Healthcare",
            Context::Education => "Education",
            Context::Sustainability => "Sustainability",
            Context::Robotics => "Robotics",
            Context::Agriculture => "Agriculture",
            Context::Technology => "Technology",
        }
    }

    /// Lenient parse used for form input: unknown or blank values fall back to General
    pub fn from_input(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Context {
    type Err = InnovationError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Context::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InnovationError::validation(format!("Unknown context '{wanted}'")))
    }
}

/// First character upper-cased, the rest lower-cased
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn build_prompt(problem: &str, context: &str) -> String {
    format!(
        "Context: {}.\n\
         Problem: {}.\n\
         Provide a detailed, creative, and practical solution to the problem.\n\
         Describe its real-world applications and potential benefits.",
        capitalize(context),
        problem
    )
}

/// Generate one innovation idea for `problem` framed in `context`.
///
/// The sampler seed is drawn from `rng`, so a seeded source reproduces the
/// same idea. Blank problems are a caller concern and are not rejected here.
pub fn generate_innovation(
    models: &ModelHandles,
    problem: &str,
    context: &str,
    rng: &mut dyn RngCore,
) -> Result<String> {
    let prompt = build_prompt(problem, context);
    let seed = rng.next_u64();
    tracing::debug!(
        "Invoking {} (context={}, prompt_chars={})",
        models.text.name(),
        context,
        prompt.len()
    );

    let outputs = models
        .text
        .generate(&prompt, &models.generation, seed)
        .map_err(|e| match e {
            InnovationError::Generation { .. } => e,
            other => InnovationError::Generation {
                message: other.to_string(),
            },
        })?;

    outputs
        .into_iter()
        .next()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| InnovationError::Generation {
            message: "model returned no sequences".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, ModelBackend};
    use crate::models::offline::OfflineConceptScorer;
    use crate::models::{ModelHandles, TextGenerator};
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::{Arc, Mutex};

    /// Records every call and replies with a fixed script
    struct ScriptedGenerator {
        reply: std::result::Result<Vec<String>, String>,
        calls: Mutex<Vec<(String, GenerationConfig, u64)>>,
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(
            &self,
            prompt: &str,
            params: &GenerationConfig,
            seed: u64,
        ) -> Result<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), *params, seed));
            self.reply.clone().map_err(|message| InnovationError::Internal { message })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn handles(reply: std::result::Result<Vec<String>, String>) -> (ModelHandles, Arc<ScriptedGenerator>) {
        let generator = Arc::new(ScriptedGenerator {
            reply,
            calls: Mutex::new(Vec::new()),
        });
        let models = ModelHandles::new(
            generator.clone(),
            Arc::new(OfflineConceptScorer),
            GenerationConfig::default(),
            ModelBackend::Offline,
        );
        (models, generator)
    }

    #[test]
    fn capitalize_matches_sentence_case() {
        assert_eq!(capitalize("sustainability"), "Sustainability");
        assert_eq!(capitalize("HEALTHCARE"), "Healthcare");
        assert_eq!(capitalize("smart agriculture"), "Smart agriculture");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn prompt_embeds_context_and_verbatim_problem() {
        let prompt = build_prompt("Reduce plastic waste in oceans", "sustainability");
        assert_eq!(
            prompt,
            "Context: Sustainability.\n\
             Problem: Reduce plastic waste in oceans.\n\
             Provide a detailed, creative, and practical solution to the problem.\n\
             Describe its real-world applications and potential benefits."
        );
    }

    #[test]
    fn generate_trims_first_sequence_and_passes_sampling_params() {
        let (models, generator) = handles(Ok(vec![
            "  Context: Sustainability. A floating skimmer fleet.\n\n".to_string(),
            "ignored".to_string(),
        ]));
        let mut rng = StdRng::seed_from_u64(42);
        let idea =
            generate_innovation(&models, "Reduce plastic waste in oceans", "Sustainability", &mut rng)
                .unwrap();
        assert_eq!(idea, "Context: Sustainability. A floating skimmer fleet.");

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (prompt, params, _seed) = &calls[0];
        assert!(prompt.contains("Sustainability"));
        assert!(prompt.contains("Reduce plastic waste in oceans"));
        assert_eq!(params.max_length, 200);
        assert_eq!(params.num_return_sequences, 1);
        assert!((params.temperature - 0.7).abs() < 1e-9);
        assert!((params.top_p - 0.95).abs() < 1e-9);
    }

    #[test]
    fn seed_comes_from_injected_rng() {
        let (models, generator) = handles(Ok(vec!["idea".to_string()]));
        let expected = StdRng::seed_from_u64(9).next_u64();
        let mut rng = StdRng::seed_from_u64(9);
        generate_innovation(&models, "p", "general", &mut rng).unwrap();
        assert_eq!(generator.calls.lock().unwrap()[0].2, expected);
    }

    #[test]
    fn model_failure_becomes_generation_error() {
        let (models, _) = handles(Err("CUDA out of memory".to_string()));
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate_innovation(&models, "p", "general", &mut rng).unwrap_err();
        assert!(matches!(err, InnovationError::Generation { .. }));
        assert!(err.to_string().contains("CUDA out of memory"));
    }

    #[test]
    fn empty_model_output_is_a_failure() {
        let (models, _) = handles(Ok(vec![]));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_innovation(&models, "p", "general", &mut rng).is_err());
    }

    #[test]
    fn context_parses_labels_and_defaults() {
        assert_eq!("robotics".parse::<Context>().unwrap(), Context::Robotics);
        assert_eq!(Context::from_input(Some("Technology")), Context::Technology);
        assert_eq!(Context::from_input(Some("mars")), Context::General);
        assert_eq!(Context::from_input(None), Context::General);
    }
}
