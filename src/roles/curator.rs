//! Curator role - turns a reflection into a concrete delta batch

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Role};
use crate::llm::{CompletionClient, CompletionOptions};
use crate::playbook::{DeltaBatch, Playbook};

use super::completion::{complete_validated, DEFAULT_MAX_RETRIES};
use super::prompts::{render, CURATOR_PROMPT};
use super::reflector::ReflectorOutput;

/// Validated curator reply: the typed delta plus the raw parsed object
#[derive(Debug, Clone)]
pub struct CuratorOutput {
    pub delta: DeltaBatch,
    pub raw: Value,
}

pub struct Curator {
    llm: Arc<dyn CompletionClient>,
    prompt_template: String,
    max_retries: usize,
}

impl Curator {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self {
            llm,
            prompt_template: CURATOR_PROMPT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Propose playbook edits for one reflected sample. A reply that does
    /// not parse into a delta batch counts as a transient parse failure.
    pub async fn curate(
        &self,
        reflection: &ReflectorOutput,
        playbook: &Playbook,
        question_context: &str,
        progress: &str,
        options: &CompletionOptions,
    ) -> Result<CuratorOutput, EngineError> {
        let stats = serde_json::to_string(&playbook.stats()).unwrap_or_else(|_| "{}".to_string());
        let reflection_text =
            serde_json::to_string_pretty(&reflection.raw).unwrap_or_else(|_| "{}".to_string());
        let playbook_text = playbook.as_prompt();

        let base_prompt = render(
            &self.prompt_template,
            &[
                ("progress", progress),
                ("stats", &stats),
                ("reflection", &reflection_text),
                (
                    "playbook",
                    if playbook_text.is_empty() {
                        "(empty playbook)"
                    } else {
                        playbook_text.as_str()
                    },
                ),
                ("question_context", question_context),
            ],
        );

        debug!(progress, "curator prompt built");
        complete_validated(
            self.llm.as_ref(),
            Role::Curator,
            &base_prompt,
            options,
            self.max_retries,
            |map| {
                let delta = DeltaBatch::from_json(&map)?;
                Ok(CuratorOutput {
                    delta,
                    raw: Value::Object(map),
                })
            },
        )
        .await
    }
}
