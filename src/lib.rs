//! # Planrun
//!
//! Plan-then-execute coding agent for your terminal.
//!
//! Planrun turns a free-form coding request into a structured plan of tasks,
//! orders them by dependencies and priority, and carries them out one at a
//! time against a completion backend, grounding every step in workspace files
//! and the results of earlier steps.
//!
//! ## Features
//!
//! - **Plan Synthesis**: Request to validated, dependency-aware plan
//! - **Ordered Execution**: Topological order with priority tie-breaks and cycle breaking
//! - **Bounded Recovery**: One corrected attempt for failed high-priority tasks
//! - **Single-Flight**: At most one plan runs per engine
//! - **Provider Fallback**: Claude with Ollama fallback (optional)
//!
//! ## Quick Start
//!
//! ```bash
//! # Plan and execute a request
//! planrun run "add input validation to the signup handler"
//!
//! # Only show the plan
//! planrun plan "split the parser module" --json
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::redundant_clone)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::format_push_string)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod ai;
pub mod core;
pub mod operations;
pub mod workflow;
pub mod workspace;

#[cfg(feature = "ai")]
pub use ai::{ClaudeProvider, OllamaProvider};
pub use ai::{AIError, AIManager, CompletionOptions, CompletionProvider};

pub use operations::{FileBlockApplier, OperationHandler, OperationOutcome};
pub use workspace::{LocalWorkspace, Workspace};

// Re-export commonly used types
pub use core::Config;
pub use workflow::{
    ExecutionSummary, Plan, PlanEngine, PlanStatus, Priority, Task, TaskKind, TaskResult,
    TaskStatus, WorkflowError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "planrun";
