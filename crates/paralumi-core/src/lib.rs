//! `paralumi-core` — pick environments by a config value and run one stack
//! operation per environment in parallel.
//!
//! # Pipeline
//!
//! ```text
//! list_environments        ← ConfigStore, one call
//!     │
//!     ▼
//! filter_environments      ← one config lookup per env, all in flight at once
//!     │
//!     ▼
//! build_stack_index        ← every stack's bound envs, one env → at most one stack
//!     │
//!     ▼
//! resolve_stacks           ← existing stack, or "{env}-{base}"
//!     │
//!     ▼
//! execute                  ← StackEngine preview/apply per env, output to a file each
//!     │
//!     ▼
//! RunReport                ← successes in completion order + failed env names
//! ```
//!
//! Stages run one after another; concurrency only exists inside the filter
//! and execute stages. The collaborators are the [`ConfigStore`] and
//! [`StackEngine`] traits; `pulumi-driver` implements both on top of the
//! `pulumi` CLI.

pub mod backend;
pub mod cancel;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod orchestrator;
pub mod types;

pub use backend::{ConfigStore, OutputSink, StackEngine};
pub use cancel::{CancelToken, RunContext};
pub use config::{FileConfig, ProjectSettings, RunSettings};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
pub use error::{ParalumiError, Result};
pub use orchestrator::{Orchestrator, RunReport, RunRequest, Target, REPORT_HEADERS};
pub use types::{
    ChangeSummary, ConfigSelector, OperationKind, OperationResult, StackHandle, StackId,
    StackIndex, StackSummary,
};
