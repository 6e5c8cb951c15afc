//! Random concept picker over a fixed, closed set of ideas.

use rand::{RngCore, seq::SliceRandom};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RandomConcept {
    pub idea: &'static str,
    pub use_case: &'static str,
}

pub static RANDOM_CONCEPTS: [RandomConcept; 5] = [
    RandomConcept {
        idea: "AI-powered IoT sensors to optimize energy usage in smart homes.",
        use_case: "Reduces energy bills by up to 40% while ensuring sustainability.",
    },
    RandomConcept {
        idea: "AR glasses for real-time translation during conversations.",
        use_case: "Breaks language barriers, enabling seamless global communication.",
    },
    RandomConcept {
        idea: "Wearable devices that monitor mental health and provide guided therapy sessions.",
        use_case: "Helps individuals manage stress and anxiety proactively.",
    },
    RandomConcept {
        idea: "Personalized e-learning platforms using adaptive AI to match individual learning styles.",
        use_case: "Improves student outcomes and engagement by 50%.",
    },
    RandomConcept {
        idea: "Blockchain-based food traceability system.",
        use_case: "Ensures food safety by tracking the origin and quality of produce.",
    },
];

/// Uniform pick from `RANDOM_CONCEPTS`
pub fn pick(rng: &mut dyn RngCore) -> &'static RandomConcept {
    RANDOM_CONCEPTS.choose(rng).unwrap_or(&RANDOM_CONCEPTS[0])
}
