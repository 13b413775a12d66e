//! Workflow error types.

use super::extract::PlanParseError;
use crate::ai::AIError;

/// Errors surfaced by plan synthesis and execution.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The backend response contained no parseable plan.
    #[error(transparent)]
    PlanParse(#[from] PlanParseError),

    /// The plan parsed but is structurally invalid.
    #[error("invalid plan: {0}")]
    PlanValidation(String),

    /// The generative backend failed during synthesis.
    #[error("planning request failed: {0}")]
    Backend(#[from] AIError),

    /// Another plan run holds the single-flight guard.
    #[error("a plan is already running")]
    Busy,

    /// The pre-flight cancellation check fired.
    #[error("request cancelled before execution started")]
    Cancelled,
}

impl WorkflowError {
    /// Whether this error happened while turning the request into a plan.
    pub fn is_synthesis_error(&self) -> bool {
        matches!(self, Self::PlanParse(_) | Self::PlanValidation(_) | Self::Backend(_))
    }
}
