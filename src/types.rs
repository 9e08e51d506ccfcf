//! Shared types at the adapter boundary
//!
//! A [`Sample`] is what the host application feeds the control loop; a
//! [`TaskEnvironment`] scores the generator's answer. Neither may touch the
//! playbook directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::roles::GeneratorOutput;

/// One unit of work for the adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    /// The question the generator must answer
    pub question: String,
    /// Optional free-form context shown to the generator
    #[serde(default)]
    pub context: Option<String>,
    /// Optional reference answer, forwarded to the reflector
    #[serde(default)]
    pub ground_truth: Option<String>,
    /// Open metadata carried through to the curator's context block
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Sample {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            context: None,
            ground_truth: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_ground_truth(mut self, ground_truth: impl Into<String>) -> Self {
        self.ground_truth = Some(ground_truth.into());
        self
    }
}

/// Verdict from the external environment for one sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentResult {
    /// Free-form feedback fed to the reflector
    pub feedback: String,
    /// Reference answer, if the environment knows one
    #[serde(default)]
    pub ground_truth: Option<String>,
    /// Numeric metrics (e.g. accuracy) for the caller's bookkeeping
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
}

/// Task-specific scorer, supplied by the host application.
///
/// Called synchronously between the generator and reflector steps. It only
/// receives borrows, so it cannot reach the playbook.
pub trait TaskEnvironment {
    fn evaluate(
        &mut self,
        sample: &Sample,
        generator_output: &GeneratorOutput,
    ) -> EnvironmentResult;
}
