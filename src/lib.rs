//! Adaptive Playbook - self-improving memory for LLM pipelines
//!
//! Maintains a growing, mutable playbook of short heuristics that a pipeline
//! reads before answering and revises after seeing the outcome:
//! - A typed delta protocol is the only way model output mutates memory
//! - Three roles (generator, reflector, curator) each coerce untrusted JSON
//!   replies into strict schemas, with a bounded corrective-retry policy
//! - Offline and online adapters drive the closed loop sample by sample
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use adaptive_playbook::adapter::{Adapter, OfflineAdapter};
//! use adaptive_playbook::environment::ExactMatchEnvironment;
//! use adaptive_playbook::llm::OpenRouterClient;
//! use adaptive_playbook::roles::{Curator, Generator, Reflector};
//! use adaptive_playbook::types::Sample;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = Arc::new(OpenRouterClient::new(std::env::var("OPENROUTER_API_KEY")?));
//!     let adapter = Adapter::new(
//!         Generator::new(client.clone()),
//!         Reflector::new(client.clone()),
//!         Curator::new(client),
//!     );
//!     let mut offline = OfflineAdapter::new(adapter);
//!     let samples = vec![Sample::new("return 42").with_ground_truth("42")];
//!     let results = offline.run(&samples, &mut ExactMatchEnvironment, 1).await?;
//!     println!("{}", results[0].playbook_snapshot);
//!     Ok(())
//! }
//! ```

// Core modules (order matters for cross-module dependencies)
pub mod error;
pub mod llm; // Must come before roles since roles depend on the client trait
pub mod playbook;
pub mod roles;
pub mod types;
pub mod adapter;
pub mod environment;
pub mod config;
pub mod cli;

// Re-export commonly used types for convenience
pub use adapter::{Adapter, AdapterStepResult, OfflineAdapter, OnlineAdapter};
pub use error::EngineError;
pub use playbook::{Bullet, DeltaBatch, DeltaOperation, Playbook, TagKind};
pub use roles::{Curator, Generator, Reflector};
pub use types::{EnvironmentResult, Sample, TaskEnvironment};

pub use config::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
