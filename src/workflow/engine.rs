//! Plan engine: end-to-end orchestration of one request.
//!
//! ```text
//! request -> synthesize -> gather context -> resolve order -> run tasks -> summary
//! ```
//!
//! Tasks run strictly one after another. Only one plan may run per engine at
//! a time; a second request while a run is in flight is rejected, not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;

use super::context::{ContextGatherer, GatheredContext};
use super::error::WorkflowError;
use super::executor::{ExecutorConfig, TaskExecutor};
use super::model::{Plan, PlanStatus, Priority, TaskResult, TaskStatus};
use super::planning::PlanSynthesizer;
use super::recovery::RecoveryHandler;
use super::resolver::resolve_order;
use super::summary::{render_summary, ExecutionSummary};
use crate::ai::CompletionProvider;
use crate::operations::OperationHandler;
use crate::workspace::Workspace;

/// Pre-flight cancellation check, polled once before a run starts.
pub type CancelCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Returned when a request arrives while another run is in flight.
pub const BUSY_MESSAGE: &str = "Another plan is already running. Please try again later.";

/// Returned when the pre-flight cancellation check fires.
pub const CANCELLED_MESSAGE: &str = "Request cancelled before execution started.";

/// Message recorded for tasks whose dependencies did not complete.
pub const DEPENDENCIES_NOT_MET: &str = "Dependencies not met";

/// Interrupt bookkeeping for one run.
///
/// An interrupt that arrives before the run starts is reported through the
/// pre-flight [`CancelCheck`]. Once that check has been consumed, or on a
/// repeated interrupt, [`Interrupt::signal`] asks the caller to terminate.
#[derive(Debug, Default)]
pub struct Interrupt {
    cancelled: AtomicBool,
    started: AtomicBool,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an interrupt. Returns `true` when the caller should exit.
    pub fn signal(&self) -> bool {
        let repeated = self.cancelled.swap(true, Ordering::SeqCst);
        repeated || self.started.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Mark the run as started and report whether it was cancelled first.
    pub fn begin(&self) -> bool {
        self.started.store(true, Ordering::SeqCst);
        self.is_cancelled()
    }

    /// Pre-flight check backed by this interrupt state.
    pub fn cancel_check(self: &Arc<Self>) -> CancelCheck {
        let interrupt = Arc::clone(self);
        Arc::new(move || interrupt.begin())
    }
}

/// Scoped hold on the engine's single-flight flag.
///
/// Released on drop, so every exit path (including unwinding) clears it.
#[derive(Debug)]
pub struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    /// Try to take the flag; `None` if it is already held.
    pub fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Orchestrates plan synthesis and execution.
pub struct PlanEngine {
    provider: Arc<dyn CompletionProvider>,
    workspace: Arc<dyn Workspace>,
    operations: Arc<dyn OperationHandler>,
    config: ExecutorConfig,
    cancel_check: Option<CancelCheck>,
    running: AtomicBool,
}

impl PlanEngine {
    /// Create an engine over the given collaborators.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        workspace: Arc<dyn Workspace>,
        operations: Arc<dyn OperationHandler>,
    ) -> Self {
        Self {
            provider,
            workspace,
            operations,
            config: ExecutorConfig::default(),
            cancel_check: None,
            running: AtomicBool::new(false),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancel_check(mut self, check: CancelCheck) -> Self {
        self.cancel_check = Some(check);
        self
    }

    /// Whether a run currently holds the single-flight flag.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Turn a request into a plan, run it, and return the rendered summary.
    ///
    /// Never fails: every error becomes explanatory text.
    pub async fn process_request(&self, request: &str) -> String {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            tracing::warn!("Rejecting request, a plan is already running");
            return BUSY_MESSAGE.to_string();
        };

        if self.cancel_check.as_ref().is_some_and(|check| check()) {
            tracing::info!("Request cancelled before execution");
            return CANCELLED_MESSAGE.to_string();
        }

        let mut plan = match self.synthesize(request).await {
            Ok(plan) => plan,
            Err(e) => {
                tracing::error!(error = %e, "Plan synthesis failed");
                return format!("Failed to create a plan: {e}");
            }
        };

        self.run(&mut plan).await;
        render_summary(&plan)
    }

    /// Synthesize a plan without executing it.
    pub async fn synthesize(&self, request: &str) -> Result<Plan, WorkflowError> {
        PlanSynthesizer::new(self.provider.as_ref())
            .with_options(self.config.planning)
            .synthesize(request)
            .await
    }

    /// Run an existing plan.
    ///
    /// Completed tasks are skipped, so a partially completed plan can be run
    /// again without repeating finished work.
    pub async fn execute_plan(&self, plan: &mut Plan) -> Result<ExecutionSummary, WorkflowError> {
        let _guard = RunGuard::acquire(&self.running).ok_or(WorkflowError::Busy)?;
        self.run(plan).await;
        Ok(ExecutionSummary::from_plan(plan))
    }

    async fn run(&self, plan: &mut Plan) {
        plan.status = PlanStatus::InProgress;
        tracing::info!(plan = %plan.id, tasks = plan.tasks.len(), "Starting plan");

        let context =
            ContextGatherer::new(self.workspace.as_ref()).gather(&plan.context_patterns).await;
        let order = resolve_order(&plan.tasks);

        let executor =
            TaskExecutor::new(self.provider.as_ref(), self.operations.as_ref(), &self.config);
        let recovery = RecoveryHandler::new(
            self.provider.as_ref(),
            self.operations.as_ref(),
            self.config.recovery,
        );

        for index in order {
            self.run_task(plan, index, &context, &executor, &recovery).await;
        }

        plan.status = if plan.is_complete() {
            PlanStatus::Completed
        } else {
            PlanStatus::PartiallyCompleted
        };
        let (completed, total) = plan.progress();
        tracing::info!(plan = %plan.id, status = %plan.status, completed, total, "Plan finished");
    }

    async fn run_task(
        &self,
        plan: &mut Plan,
        index: usize,
        context: &GatheredContext,
        executor: &TaskExecutor<'_>,
        recovery: &RecoveryHandler<'_>,
    ) {
        if plan.tasks[index].is_completed() {
            tracing::debug!(task = %plan.tasks[index].id, "Task already completed, skipping");
            return;
        }

        if plan.tasks[index].status == TaskStatus::Failed {
            plan.tasks[index].reset();
        }

        let task = &plan.tasks[index];
        let id = task.id.clone();

        if !task.dependencies.iter().all(|dep| plan.is_task_completed(dep)) {
            tracing::warn!(task = %id, "Dependencies not met");
            plan.tasks[index].status = TaskStatus::Failed;
            plan.results.insert(id, TaskResult::failure(DEPENDENCIES_NOT_MET));
            return;
        }

        {
            let task = &mut plan.tasks[index];
            task.status = TaskStatus::InProgress;
            task.started_at = Some(Utc::now());
            task.ended_at = None;
        }
        tracing::info!(task = %id, kind = %plan.tasks[index].kind, "Task started");

        let outcome = {
            let snapshot: &Plan = plan;
            executor.execute(&snapshot.tasks[index], snapshot, context).await
        };

        match outcome {
            Ok(result) => {
                tracing::info!(task = %id, operations = result.operation_ids.len(), "Task completed");
                plan.tasks[index].status = TaskStatus::Completed;
                plan.results.insert(id.clone(), result);
            }
            Err(e) => {
                let error = e.to_string();
                tracing::warn!(task = %id, error = %error, "Task failed");
                plan.tasks[index].status = TaskStatus::Failed;
                plan.results.insert(id.clone(), TaskResult::failure(error.clone()));

                if plan.tasks[index].priority == Priority::High {
                    self.attempt_recovery(plan, index, &error, recovery).await;
                }
            }
        }

        plan.tasks[index].ended_at = Some(Utc::now());
    }

    async fn attempt_recovery(
        &self,
        plan: &mut Plan,
        index: usize,
        error: &str,
        recovery: &RecoveryHandler<'_>,
    ) {
        let id = plan.tasks[index].id.clone();

        let attempt = {
            let snapshot: &Plan = plan;
            recovery.recover(&snapshot.tasks[index], error, snapshot).await
        };

        match attempt {
            Ok(outcome) if outcome.recovered() => {
                tracing::info!(task = %id, operations = outcome.operation_ids.len(), "Task recovered");
                plan.tasks[index].status = TaskStatus::Completed;
                plan.results.insert(
                    id,
                    TaskResult {
                        success: true,
                        message: format!(
                            "Recovered after error: {error}\n\n{}",
                            outcome.response.trim()
                        ),
                        artifacts: outcome.file_paths,
                        operation_ids: outcome.operation_ids,
                    },
                );
            }
            Ok(_) => {
                tracing::warn!(task = %id, "Recovery produced no operations");
                plan.results.insert(
                    id,
                    TaskResult::failure(format!("{error} (recovery produced no changes)")),
                );
            }
            Err(e) => {
                tracing::warn!(task = %id, error = %e, "Recovery attempt failed");
                plan.results
                    .insert(id, TaskResult::failure(format!("{error} (recovery failed: {e})")));
            }
        }
    }
}
