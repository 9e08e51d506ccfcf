//! Offline driver - a fixed sample set, iterated for a number of epochs

use tracing::info;

use super::{Adapter, AdapterStepResult, Progress};
use crate::error::EngineError;
use crate::playbook::Playbook;
use crate::types::{Sample, TaskEnvironment};

/// Runs a finite, indexable collection of samples for `epochs` passes;
/// sample totals reset each epoch.
pub struct OfflineAdapter {
    inner: Adapter,
}

impl OfflineAdapter {
    pub fn new(inner: Adapter) -> Self {
        Self { inner }
    }

    pub fn playbook(&self) -> &Playbook {
        self.inner.playbook()
    }

    pub fn into_playbook(self) -> Playbook {
        self.inner.into_playbook()
    }

    /// Process every sample, in list order, once per epoch. The first failed
    /// step aborts the run; playbook state committed by earlier steps is
    /// kept and can be recovered through [`Self::playbook`].
    pub async fn run<E: TaskEnvironment>(
        &mut self,
        samples: &[Sample],
        environment: &mut E,
        epochs: usize,
    ) -> Result<Vec<AdapterStepResult>, EngineError> {
        let mut results = Vec::with_capacity(samples.len() * epochs);
        for epoch in 1..=epochs {
            info!(epoch, epochs, samples = samples.len(), "starting offline epoch");
            for (index, sample) in samples.iter().enumerate() {
                let progress = Progress {
                    epoch,
                    total_epochs: epochs,
                    sample: index + 1,
                    total_samples: samples.len(),
                };
                let result = self
                    .inner
                    .process_sample(sample.clone(), environment, progress)
                    .await?;
                results.push(result);
            }
        }
        Ok(results)
    }
}
