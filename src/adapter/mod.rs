//! Adapter - the closed-loop control flow
//!
//! Drives each sample through generate -> evaluate -> reflect -> curate ->
//! apply, and carries the shared playbook plus a bounded window of recent
//! reflections across samples. Single logical writer: all playbook mutation
//! happens inside this sequential loop.

pub mod offline;
pub mod online;

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::error::EngineError;
use crate::llm::CompletionOptions;
use crate::playbook::Playbook;
use crate::roles::{Curator, CuratorOutput, Generator, GeneratorOutput, Reflector, ReflectorOutput};
use crate::types::{EnvironmentResult, Sample, TaskEnvironment};

pub use offline::OfflineAdapter;
pub use online::OnlineAdapter;

/// Default size of the recent-reflection window
pub const DEFAULT_REFLECTION_WINDOW: usize = 3;

/// Separator between reflections when the window is joined into one context
/// string for the generator
const REFLECTION_SEPARATOR: &str = "\n---\n";

/// Everything produced by one adapter step
#[derive(Debug, Clone)]
pub struct AdapterStepResult {
    pub sample: Sample,
    pub generator_output: GeneratorOutput,
    pub environment_result: EnvironmentResult,
    pub reflection: ReflectorOutput,
    pub curator_output: CuratorOutput,
    /// Fresh `as_prompt()` rendering after the delta was applied
    pub playbook_snapshot: String,
}

/// Position of the current step, rendered into the curator's progress string
#[derive(Debug, Clone, Copy)]
pub(crate) struct Progress {
    pub epoch: usize,
    pub total_epochs: usize,
    pub sample: usize,
    pub total_samples: usize,
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "epoch {}/{} · sample {}/{}",
            self.epoch, self.total_epochs, self.sample, self.total_samples
        )
    }
}

/// Shared state and per-sample step logic behind both driver variants
pub struct Adapter {
    playbook: Playbook,
    generator: Generator,
    reflector: Reflector,
    curator: Curator,
    max_refinement_rounds: usize,
    reflection_window: usize,
    recent_reflections: VecDeque<String>,
    options: CompletionOptions,
}

impl Adapter {
    pub fn new(generator: Generator, reflector: Reflector, curator: Curator) -> Self {
        Self {
            playbook: Playbook::new(),
            generator,
            reflector,
            curator,
            max_refinement_rounds: 1,
            reflection_window: DEFAULT_REFLECTION_WINDOW,
            recent_reflections: VecDeque::with_capacity(DEFAULT_REFLECTION_WINDOW + 1),
            options: CompletionOptions::default(),
        }
    }

    /// Start from an existing playbook (e.g. loaded from a snapshot)
    pub fn with_playbook(mut self, playbook: Playbook) -> Self {
        self.playbook = playbook;
        self
    }

    pub fn with_reflection_window(mut self, window: usize) -> Self {
        self.reflection_window = window;
        self
    }

    pub fn with_max_refinement_rounds(mut self, rounds: usize) -> Self {
        self.max_refinement_rounds = rounds;
        self
    }

    /// Completion options forwarded to every role call
    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn playbook(&self) -> &Playbook {
        &self.playbook
    }

    /// Hand the playbook back to the caller (e.g. to persist a snapshot)
    pub fn into_playbook(self) -> Playbook {
        self.playbook
    }

    fn reflection_context(&self) -> Option<String> {
        if self.recent_reflections.is_empty() {
            return None;
        }
        let joined: Vec<&str> = self.recent_reflections.iter().map(String::as_str).collect();
        Some(joined.join(REFLECTION_SEPARATOR))
    }

    fn push_reflection(&mut self, reflection: &ReflectorOutput) {
        self.recent_reflections.push_back(reflection.raw.to_string());
        while self.recent_reflections.len() > self.reflection_window {
            self.recent_reflections.pop_front();
        }
    }

    /// Tags from untrusted reflection output: a missing bullet or bad tag
    /// name is dropped, never propagated.
    fn apply_bullet_tags(&mut self, reflection: &ReflectorOutput) {
        for tag in &reflection.bullet_tags {
            match self.playbook.tag_bullet(&tag.id, &tag.tag, 1) {
                Ok(Some(_)) => {}
                Ok(None) => debug!(bullet_id = %tag.id, "reflection tag skipped: bullet not found"),
                Err(err) => debug!(bullet_id = %tag.id, error = %err, "reflection tag skipped"),
            }
        }
    }

    fn question_context(sample: &Sample, env_result: &EnvironmentResult) -> String {
        let metadata =
            serde_json::to_string(&sample.metadata).unwrap_or_else(|_| "{}".to_string());
        [
            format!("question: {}", sample.question),
            format!("context: {}", sample.context.as_deref().unwrap_or_default()),
            format!("metadata: {}", metadata),
            format!("feedback: {}", env_result.feedback),
            format!(
                "ground_truth: {}",
                env_result.ground_truth.as_deref().unwrap_or_default()
            ),
        ]
        .join("\n")
    }

    /// One full step. An error aborts this sample only; playbook state
    /// committed by earlier samples is untouched.
    pub(crate) async fn process_sample<E: TaskEnvironment>(
        &mut self,
        sample: Sample,
        environment: &mut E,
        progress: Progress,
    ) -> Result<AdapterStepResult, EngineError> {
        let reflection_context = self.reflection_context();
        let generator_output = self
            .generator
            .generate(
                &sample.question,
                sample.context.as_deref(),
                &self.playbook,
                reflection_context.as_deref(),
                &self.options,
            )
            .await?;

        let environment_result = environment.evaluate(&sample, &generator_output);

        let reflection = self
            .reflector
            .reflect(
                &sample.question,
                &generator_output,
                &self.playbook,
                sample.ground_truth.as_deref(),
                Some(&environment_result.feedback),
                self.max_refinement_rounds,
                &self.options,
            )
            .await?;

        self.apply_bullet_tags(&reflection);
        self.push_reflection(&reflection);

        let curator_output = self
            .curator
            .curate(
                &reflection,
                &self.playbook,
                &Self::question_context(&sample, &environment_result),
                &progress.to_string(),
                &self.options,
            )
            .await?;
        self.playbook.apply_delta(&curator_output.delta);

        info!(
            %progress,
            operations = curator_output.delta.operations.len(),
            bullets = self.playbook.stats().bullets,
            "adapter step committed"
        );

        Ok(AdapterStepResult {
            playbook_snapshot: self.playbook.as_prompt(),
            sample,
            generator_output,
            environment_result,
            reflection,
            curator_output,
        })
    }
}
