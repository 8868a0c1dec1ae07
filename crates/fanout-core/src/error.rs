//! Error taxonomy for runner calls.
//!
//! Any of these aborts the whole call: partial result sets are never
//! returned. Callers needing partial progress should run smaller batches.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure of a strategy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunnerError {
    /// The global deadline passed before all results arrived.
    Timeout {
        waited_ms: u64,
        limit_ms: u64,
        completed: usize,
        total: usize,
    },
    /// The call was aborted by a cancellation signal.
    Cancelled { at_id: Option<u32> },
    /// A single work item's computation failed.
    Compute { id: u32, source: String },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::Timeout {
                waited_ms,
                limit_ms,
                completed,
                total,
            } => {
                write!(
                    f,
                    "timed out after {}ms (limit: {}ms): {} of {} results arrived",
                    waited_ms, limit_ms, completed, total
                )
            }
            RunnerError::Cancelled { at_id } => {
                write!(f, "cancelled")?;
                if let Some(id) = at_id {
                    write!(f, " (id: {})", id)?;
                }
                Ok(())
            }
            RunnerError::Compute { id, source } => {
                write!(f, "compute failed for id {}: {}", id, source)
            }
        }
    }
}

impl std::error::Error for RunnerError {}
