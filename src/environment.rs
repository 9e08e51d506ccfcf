//! Built-in environments
//!
//! Real deployments supply their own [`TaskEnvironment`]; the exact-match
//! scorer here covers the CLI demo and tests.

use std::collections::HashMap;

use crate::roles::GeneratorOutput;
use crate::types::{EnvironmentResult, Sample, TaskEnvironment};

/// Scores an answer by case-insensitive, whitespace-trimmed comparison with
/// the sample's ground truth. Feedback is "ok" or "diff"; the single metric
/// is `accuracy` in {0, 1}.
#[derive(Debug, Default, Clone)]
pub struct ExactMatchEnvironment;

impl TaskEnvironment for ExactMatchEnvironment {
    fn evaluate(
        &mut self,
        sample: &Sample,
        generator_output: &GeneratorOutput,
    ) -> EnvironmentResult {
        let ground_truth = sample.ground_truth.clone().unwrap_or_default();
        let correct = generator_output.final_answer.trim().to_lowercase()
            == ground_truth.trim().to_lowercase();

        let mut metrics = HashMap::new();
        metrics.insert("accuracy".to_string(), if correct { 1.0 } else { 0.0 });

        EnvironmentResult {
            feedback: if correct { "ok" } else { "diff" }.to_string(),
            ground_truth: Some(ground_truth),
            metrics,
        }
    }
}
