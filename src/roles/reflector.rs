//! Reflector role - diagnoses a generator attempt against feedback

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Role};
use crate::llm::{CompletionClient, CompletionOptions};
use crate::playbook::Playbook;

use super::completion::{complete_validated, string_field, DEFAULT_MAX_RETRIES};
use super::generator::GeneratorOutput;
use super::prompts::{format_optional, render, REFLECTOR_PROMPT};

/// One verdict on a referenced playbook bullet; `tag` is lowercased on parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulletTag {
    pub id: String,
    pub tag: String,
}

/// Validated reflector reply
#[derive(Debug, Clone, Serialize)]
pub struct ReflectorOutput {
    pub reasoning: String,
    pub error_identification: String,
    pub root_cause_analysis: String,
    pub correct_approach: String,
    pub key_insight: String,
    pub bullet_tags: Vec<BulletTag>,
    pub raw: Value,
}

impl ReflectorOutput {
    /// A round is conclusive when it tagged at least one bullet or produced
    /// a non-empty insight.
    fn is_conclusive(&self) -> bool {
        !self.bullet_tags.is_empty() || !self.key_insight.is_empty()
    }
}

pub struct Reflector {
    llm: Arc<dyn CompletionClient>,
    prompt_template: String,
    max_retries: usize,
}

impl Reflector {
    pub fn new(llm: Arc<dyn CompletionClient>) -> Self {
        Self {
            llm,
            prompt_template: REFLECTOR_PROMPT.to_string(),
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

    /// Excerpt only the bullets the generator actually referenced,
    /// deduplicated in first-seen order.
    fn playbook_excerpt(playbook: &Playbook, bullet_ids: &[String]) -> String {
        let mut seen = std::collections::HashSet::new();
        let mut lines = Vec::new();
        for id in bullet_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(bullet) = playbook.get_bullet(id) {
                lines.push(format!("[{}] {}", bullet.id, bullet.content));
            }
        }
        lines.join("\n")
    }

    /// Diagnose one generator attempt. Runs up to `max_refinement_rounds`
    /// rounds; each round rebuilds the base prompt fresh and retries per the
    /// shared policy. The first conclusive round wins; otherwise the last
    /// parsed result is the fallback. No parsed result at all is terminal.
    #[allow(clippy::too_many_arguments)]
    pub async fn reflect(
        &self,
        question: &str,
        generator_output: &GeneratorOutput,
        playbook: &Playbook,
        ground_truth: Option<&str>,
        feedback: Option<&str>,
        max_refinement_rounds: usize,
        options: &CompletionOptions,
    ) -> Result<ReflectorOutput, EngineError> {
        let excerpt = Self::playbook_excerpt(playbook, &generator_output.bullet_ids);
        let base_prompt = render(
            &self.prompt_template,
            &[
                ("question", question),
                ("reasoning", &generator_output.reasoning),
                ("prediction", &generator_output.final_answer),
                ("ground_truth", format_optional(ground_truth)),
                ("feedback", format_optional(feedback)),
                (
                    "playbook_excerpt",
                    if excerpt.is_empty() {
                        "(no bullets referenced)"
                    } else {
                        excerpt.as_str()
                    },
                ),
            ],
        );

        let rounds = max_refinement_rounds.max(1);
        let mut fallback: Option<ReflectorOutput> = None;
        let mut last_failure: Option<EngineError> = None;

        for round in 0..rounds {
            let mut round_options = options.clone();
            round_options
                .extra
                .insert("refinement_round".to_string(), Value::from(round as u64));

            let attempt = complete_validated(
                self.llm.as_ref(),
                Role::Reflector,
                &base_prompt,
                &round_options,
                self.max_retries,
                |map| Ok(decode_reflection(map)),
            )
            .await;

            match attempt {
                Ok(candidate) => {
                    if candidate.is_conclusive() {
                        return Ok(candidate);
                    }
                    debug!(round, "inconclusive reflection round, keeping as fallback");
                    fallback = Some(candidate);
                }
                // Provider failures abort the whole step.
                Err(err @ EngineError::Completion { .. }) => return Err(err),
                Err(err) => {
                    debug!(round, error = %err, "reflection round exhausted its retries");
                    last_failure = Some(err);
                }
            }
        }

        match fallback {
            Some(result) => Ok(result),
            None => Err(last_failure.unwrap_or_else(|| EngineError::GenerationFailed {
                role: Role::Reflector,
                attempts: 0,
                source: crate::error::ParseError::Schema("no refinement rounds ran".to_string()),
            })),
        }
    }
}

fn decode_reflection(map: serde_json::Map<String, Value>) -> ReflectorOutput {
    let bullet_tags = map
        .get("bullet_tags")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let entry = item.as_object()?;
                    let id = entry.get("id")?;
                    let tag = entry.get("tag")?;
                    Some(BulletTag {
                        id: value_to_string(id),
                        tag: value_to_string(tag).to_lowercase(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    ReflectorOutput {
        reasoning: string_field(&map, "reasoning"),
        error_identification: string_field(&map, "error_identification"),
        root_cause_analysis: string_field(&map, "root_cause_analysis"),
        correct_approach: string_field(&map, "correct_approach"),
        key_insight: string_field(&map, "key_insight"),
        bullet_tags,
        raw: Value::Object(map),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
