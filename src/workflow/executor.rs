//! Single-task execution.
//!
//! Builds a grounded prompt for one task, calls the completion backend and
//! hands the response to the operation handler.

use super::context::{truncate_chars, GatheredContext};
use super::model::{Plan, Task, TaskResult};
use crate::ai::{CompletionOptions, CompletionProvider};
use crate::operations::OperationHandler;

/// Instructions appended to every prompt that may produce file changes.
pub(crate) const FILE_BLOCK_INSTRUCTIONS: &str = "\
For every file you create or change, output the COMPLETE new file content in a
fenced code block whose info string contains `file:<path relative to the workspace root>`,
for example:

```rust file:src/lib.rs
pub fn example() {}
```

If the task needs no file changes, explain your findings in plain text instead.";

/// Task executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Sampling options for plan synthesis
    pub planning: CompletionOptions,

    /// Sampling options for task execution
    pub execution: CompletionOptions,

    /// Sampling options for recovery attempts
    pub recovery: CompletionOptions,

    /// Per-file character limit when rendering gathered context
    pub max_context_file_chars: usize,

    /// Per-dependency character limit when rendering prior results
    pub max_dependency_output_chars: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            planning: CompletionOptions::planning(),
            execution: CompletionOptions::execution(),
            recovery: CompletionOptions::recovery(),
            max_context_file_chars: 20_000,
            max_dependency_output_chars: 2_000,
        }
    }
}

/// Build the grounded prompt for one task.
pub fn build_task_prompt(
    task: &Task,
    plan: &Plan,
    context: &GatheredContext,
    config: &ExecutorConfig,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are an expert software developer executing one step of a larger plan.\n\n");
    prompt.push_str(&format!("Overall goal: {}\n\n", plan.main_goal));

    prompt.push_str("Current task:\n");
    prompt.push_str(&format!("- ID: {}\n", task.id));
    prompt.push_str(&format!("- Type: {}\n", task.kind));
    prompt.push_str(&format!("- Priority: {}\n", task.priority));
    prompt.push_str(&format!("- Description: {}\n\n", task.description));

    let dependency_results: Vec<_> = task
        .dependencies
        .iter()
        .filter_map(|dep| plan.results.get(dep).map(|result| (dep, result)))
        .collect();
    if !dependency_results.is_empty() {
        prompt.push_str("Results of completed prerequisite tasks:\n");
        for (dep, result) in dependency_results {
            prompt.push_str(&format!(
                "- {}: {}\n",
                dep,
                truncate_chars(&result.message, config.max_dependency_output_chars)
            ));
            if !result.artifacts.is_empty() {
                prompt.push_str(&format!("  Files: {}\n", result.artifacts.join(", ")));
            }
        }
        prompt.push('\n');
    }

    if !context.is_empty() {
        prompt.push_str("Relevant files:\n\n");
        prompt.push_str(&context.render(config.max_context_file_chars));
    }

    prompt.push_str(FILE_BLOCK_INSTRUCTIONS);
    prompt
}

/// Executes one task against the backend.
pub struct TaskExecutor<'a> {
    provider: &'a dyn CompletionProvider,
    operations: &'a dyn OperationHandler,
    config: &'a ExecutorConfig,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(
        provider: &'a dyn CompletionProvider,
        operations: &'a dyn OperationHandler,
        config: &'a ExecutorConfig,
    ) -> Self {
        Self { provider, operations, config }
    }

    /// Execute a task.
    ///
    /// Succeeds whenever the backend call and operation extraction both
    /// complete; finding no operations is not a failure.
    pub async fn execute(
        &self,
        task: &Task,
        plan: &Plan,
        context: &GatheredContext,
    ) -> anyhow::Result<TaskResult> {
        let prompt = build_task_prompt(task, plan, context, self.config);
        tracing::debug!(task = %task.id, prompt_len = prompt.len(), "Executing task");

        let response = self.provider.complete(&prompt, &self.config.execution).await?;
        let outcome = self.operations.apply_operations(&response).await?;

        if !outcome.success {
            tracing::warn!(task = %task.id, "Some operations could not be applied");
        }

        Ok(TaskResult {
            success: true,
            message: response.trim().to_string(),
            artifacts: outcome.file_paths,
            operation_ids: outcome.operation_ids,
        })
    }
}
