//! Online driver - an unbounded stream of samples, consumed once

use futures_util::{Stream, StreamExt};
use tracing::info;

use super::{Adapter, AdapterStepResult, Progress};
use crate::error::EngineError;
use crate::playbook::Playbook;
use crate::types::{Sample, TaskEnvironment};

/// Consumes samples in delivery order. The total count is unknown in
/// advance, so progress reports "processed so far" and the epoch is fixed
/// at 1.
pub struct OnlineAdapter {
    inner: Adapter,
}

impl OnlineAdapter {
    pub fn new(inner: Adapter) -> Self {
        Self { inner }
    }

    pub fn playbook(&self) -> &Playbook {
        self.inner.playbook()
    }

    pub fn into_playbook(self) -> Playbook {
        self.inner.into_playbook()
    }

    /// Drain the stream, one step per arrival. The first failed step aborts
    /// the run; playbook state committed by earlier steps is kept.
    pub async fn run<S, E>(
        &mut self,
        samples: S,
        environment: &mut E,
    ) -> Result<Vec<AdapterStepResult>, EngineError>
    where
        S: Stream<Item = Sample> + Unpin,
        E: TaskEnvironment,
    {
        let mut samples = samples;
        let mut results = Vec::new();
        let mut processed = 0usize;

        while let Some(sample) = samples.next().await {
            processed += 1;
            let progress = Progress {
                epoch: 1,
                total_epochs: 1,
                sample: processed,
                total_samples: processed,
            };
            let result = self
                .inner
                .process_sample(sample, environment, progress)
                .await?;
            results.push(result);
        }

        info!(processed, "online stream drained");
        Ok(results)
    }
}
