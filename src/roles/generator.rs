//! Generator role - produces a candidate answer conditioned on the playbook

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Role};
use crate::llm::{CompletionClient, CompletionOptions};
use crate::playbook::Playbook;

use super::completion::{complete_validated, string_field, DEFAULT_MAX_RETRIES};
use super::prompts::{format_optional, render, GENERATOR_PROMPT};

/// Validated generator reply. `raw` keeps the full parsed object so callers
/// can audit it or feed it back as context.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorOutput {
    pub reasoning: String,
    pub final_answer: String,
    /// Playbook bullets the model claims to have used
    pub bullet_ids: Vec<String>,
    pub raw: Value,
}

pub struct Generator {
    llm: Arc<dyn CompletionClient>,
    prompt_template: String,
    max_retries: usize,
}

impl Generator {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self {
            llm,
            prompt_template: GENERATOR_PROMPT.to_string(),
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

    /// Answer `question` using the current playbook and the joined window of
    /// recent reflections.
    pub async fn generate(
        &self,
        question: &str,
        context: Option<&str>,
        playbook: &Playbook,
        reflection: Option<&str>,
        options: &CompletionOptions,
    ) -> Result<GeneratorOutput, EngineError> {
        let playbook_text = playbook.as_prompt();
        let base_prompt = render(
            &self.prompt_template,
            &[
                (
                    "playbook",
                    if playbook_text.is_empty() {
                        "(empty playbook)"
                    } else {
                        playbook_text.as_str()
                    },
                ),
                ("reflection", format_optional(reflection)),
                ("question", question),
                ("context", format_optional(context)),
            ],
        );

        debug!(question, "generator prompt built");
        complete_validated(
            self.llm.as_ref(),
            Role::Generator,
            &base_prompt,
            options,
            self.max_retries,
            |map| {
                let reasoning = string_field(&map, "reasoning");
                let final_answer = string_field(&map, "final_answer");
                let bullet_ids = coerce_bullet_ids(map.get("bullet_ids"));
                Ok(GeneratorOutput {
                    reasoning,
                    final_answer,
                    bullet_ids,
                    raw: Value::Object(map),
                })
            },
        )
        .await
    }
}

/// Models return bullet ids as strings or bare numbers; anything else is
/// dropped.
fn coerce_bullet_ids(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}
