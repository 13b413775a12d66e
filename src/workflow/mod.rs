//! Plan generation and plan execution.
//!
//! Turns a free-form request into a dependency-ordered plan and runs it task
//! by task against a completion backend.
//!
//! ## Components
//!
//! - `PlanSynthesizer` - request to validated [`Plan`]
//! - `resolve_order` - dependency-aware ordering with priority tie-breaks
//! - `ContextGatherer` - reads grounding files once per run
//! - `TaskExecutor` / `RecoveryHandler` - one task, one bounded retry
//! - `PlanEngine` - the state machine and single-flight entry point

mod context;
mod engine;
mod error;
mod executor;
mod extract;
mod model;
mod planning;
mod recovery;
mod resolver;
mod summary;

pub use context::{ContextGatherer, GatheredContext};
pub use engine::{
    CancelCheck, Interrupt, PlanEngine, RunGuard, BUSY_MESSAGE, CANCELLED_MESSAGE,
    DEPENDENCIES_NOT_MET,
};
pub use error::WorkflowError;
pub use executor::{build_task_prompt, ExecutorConfig, TaskExecutor};
pub use extract::{extract_plan_block, PlanParseError};
pub use model::{Plan, PlanStatus, Priority, Task, TaskKind, TaskResult, TaskStatus};
pub use planning::{
    build_planning_prompt, parse_plan_response, validate_plan, PlanSynthesizer, RawPlan, RawTask,
};
pub use recovery::{build_recovery_prompt, RecoveryHandler, RecoveryOutcome};
pub use resolver::{resolve_ids, resolve_order};
pub use summary::{render_summary, ExecutionSummary, FailedTask};
