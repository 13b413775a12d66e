//! Bounded recovery for failed high-priority tasks.
//!
//! Exactly one re-prompt per failure. Recovery counts as successful only if
//! the response produced at least one applied operation; an apology with no
//! file changes is still a failure.

use super::executor::FILE_BLOCK_INSTRUCTIONS;
use super::model::{Plan, Task};
use crate::ai::{CompletionOptions, CompletionProvider};
use crate::operations::OperationHandler;

/// Result of a recovery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryOutcome {
    /// Operation handles produced by the attempt
    pub operation_ids: Vec<String>,

    /// Paths touched by the attempt
    pub file_paths: Vec<String>,

    /// Backend response text
    pub response: String,
}

impl RecoveryOutcome {
    pub fn recovered(&self) -> bool {
        !self.operation_ids.is_empty()
    }
}

/// Build the re-grounding prompt for a failed task.
pub fn build_recovery_prompt(task: &Task, error: &str, plan: &Plan) -> String {
    format!(
        "A step of a larger plan failed and needs a corrected approach.\n\n\
         Overall goal: {goal}\n\n\
         Failed task:\n\
         - ID: {id}\n\
         - Type: {kind}\n\
         - Description: {description}\n\n\
         Error:\n{error}\n\n\
         Work out what went wrong and complete the task with a different approach.\n\n\
         {instructions}",
        goal = plan.main_goal,
        id = task.id,
        kind = task.kind,
        description = task.description,
        instructions = FILE_BLOCK_INSTRUCTIONS,
    )
}

/// Re-attempts failed tasks once using the captured error.
pub struct RecoveryHandler<'a> {
    provider: &'a dyn CompletionProvider,
    operations: &'a dyn OperationHandler,
    options: CompletionOptions,
}

impl<'a> RecoveryHandler<'a> {
    pub fn new(
        provider: &'a dyn CompletionProvider,
        operations: &'a dyn OperationHandler,
        options: CompletionOptions,
    ) -> Self {
        Self { provider, operations, options }
    }

    /// Make a single recovery attempt.
    pub async fn recover(
        &self,
        task: &Task,
        error: &str,
        plan: &Plan,
    ) -> anyhow::Result<RecoveryOutcome> {
        tracing::info!(task = %task.id, "Attempting recovery");

        let prompt = build_recovery_prompt(task, error, plan);
        let response = self.provider.complete(&prompt, &self.options).await?;
        let outcome = self.operations.apply_operations(&response).await?;

        Ok(RecoveryOutcome {
            operation_ids: outcome.operation_ids,
            file_paths: outcome.file_paths,
            response,
        })
    }
}
