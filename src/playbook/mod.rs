//! Playbook memory: bullets, sections, and the delta protocol
//!
//! Provides:
//! - [`Bullet`] - one heuristic with effectiveness counters
//! - [`Playbook`] - the aggregate store with rendering and serialization
//! - [`DeltaBatch`] / [`DeltaOperation`] - the only sanctioned mutation path

pub mod bullet;
pub mod delta;
pub mod store;

pub use bullet::{Bullet, CounterMap, TagKind};
pub use delta::{DeltaBatch, DeltaOperation};
pub use store::{Playbook, PlaybookStats, TagTotals};
