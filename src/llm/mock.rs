//! Queue-backed completion client (for tests and the offline demo, no API)

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::bail;
use async_trait::async_trait;

use super::{CompletionClient, CompletionOptions, CompletionResponse};

/// Replays canned replies in FIFO order; errors once the queue runs dry
#[derive(Debug, Default)]
pub struct QueueClient {
    replies: Mutex<VecDeque<String>>,
}

impl QueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one reply
    pub fn push(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(text.into());
    }

    /// Enqueue a reply serialized from a JSON value
    pub fn push_json(&self, value: &serde_json::Value) {
        self.push(value.to_string());
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionClient for QueueClient {
    async fn complete(
        &self,
        _prompt: &str,
        _options: &CompletionOptions,
    ) -> anyhow::Result<CompletionResponse> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(text) => Ok(CompletionResponse::text(text)),
            None => bail!("QueueClient ran out of queued responses"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_replays_in_order() {
        let client = QueueClient::new();
        client.push("first");
        client.push("second");

        let options = CompletionOptions::default();
        assert_eq!(client.complete("p", &options).await.unwrap().text, "first");
        assert_eq!(client.complete("p", &options).await.unwrap().text, "second");
        assert!(client.complete("p", &options).await.is_err());
    }
}
