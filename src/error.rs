//! Error taxonomy
//!
//! `EngineError` is the crate's public failure surface; `ParseError` covers
//! the transient shapes the validated-completion retry loop is allowed to
//! recover from. Provider failures stay opaque (`anyhow::Error`) so transport
//! details never leak into the core types.

use thiserror::Error;

/// The pipeline role that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Generator,
    Reflector,
    Curator,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Role::Generator => "generator",
            Role::Reflector => "reflector",
            Role::Curator => "curator",
        };
        write!(f, "{}", name)
    }
}

/// Recoverable shapes of a malformed model reply. The retry loop re-prompts
/// on these; anything else aborts the step.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("reply is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("reply is not a JSON object")]
    NotAnObject,

    #[error("reply does not match the expected schema: {0}")]
    Schema(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// Tag name outside the closed counter set
    #[error("unsupported tag '{0}' (expected helpful, harmful, or neutral)")]
    UnsupportedTag(String),

    /// Snapshot payload that cannot be restored
    #[error("malformed playbook snapshot: {0}")]
    MalformedSnapshot(String),

    /// A role exhausted its retry budget without a valid reply
    #[error("{role} failed to produce valid output after {attempts} attempts")]
    GenerationFailed {
        role: Role,
        attempts: usize,
        #[source]
        source: ParseError,
    },

    /// The completion provider itself failed; never retried by the core
    #[error("{role} completion request failed")]
    Completion {
        role: Role,
        #[source]
        source: anyhow::Error,
    },
}
