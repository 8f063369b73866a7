//! Library-facing error types for the Volley scheduler.

use thiserror::Error;

/// Errors the scheduler itself can raise, as opposed to per-task failures
/// (those are captured into `TaskResult::error`, never propagated here).
#[derive(Debug, Error)]
pub enum CliffyError {
    /// `Execute` was called with an empty task list (spec §4.6 step 1).
    #[error("cannot execute an empty task batch")]
    EmptyBatch,

    /// The Agent returned `(None, None)` from `run` — a contract violation
    /// described in spec §7 ("Agent contract violation").
    #[error("agent run() returned no event stream and no error")]
    AgentStreamEnded,

    /// Anything else bubbled up from an Agent or Message Store collaborator.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CliffyError>;
