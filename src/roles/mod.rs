//! Role pipeline: Generator, Reflector, Curator
//!
//! Each role is stateless per call: build a prompt from current state, call
//! the completion provider, coerce the untrusted JSON reply into a typed
//! output, retrying with a corrective suffix on malformed replies.

pub mod completion;
pub mod curator;
pub mod generator;
pub mod prompts;
pub mod reflector;

pub use completion::DEFAULT_MAX_RETRIES;
pub use curator::{Curator, CuratorOutput};
pub use generator::{Generator, GeneratorOutput};
pub use reflector::{BulletTag, Reflector, ReflectorOutput};
