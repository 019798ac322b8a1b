//! Errors surfaced by the public workflow API
//!
//! Device I/O itself reports `anyhow::Error`; transport and malformed
//! responses are treated alike and only ever reach the presentation layer as
//! a [`FailureReason`](crate::workflow::FailureReason).

use crate::types::WorkflowKind;
use thiserror::Error;

/// User input that was rejected before any request was made
#[derive(Clone, Debug, Default, Error, PartialEq, Eq)]
#[error("{}", .problems.join("; "))]
pub struct ValidationError {
    pub problems: Vec<String>,
}

impl ValidationError {
    pub(crate) fn push(&mut self, problem: impl Into<String>) {
        self.problems.push(problem.into());
    }

    pub(crate) fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.problems.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("failed to {action} {kind}: workflow controller is not running")]
    ControllerGone {
        action: &'static str,
        kind: WorkflowKind,
    },
}
