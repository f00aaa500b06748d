mod execute;
mod filter;
mod group;
mod resolve;


use std::sync::Arc;

use serde::Serialize;

use crate::backend::{ConfigStore, StackEngine};
use crate::cancel::{CancelToken, RunContext};
use crate::config::RunSettings;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::types::{ConfigSelector, OperationKind, OperationResult, StackId};
use crate::Result;

pub use resolve::resolve_stacks;

/// Column order of the summary table.
pub const REPORT_HEADERS: &[&str] = &["FQSN", "ENV", "CREATES", "UPDATES", "DESTROYS"];

// ---------------------------------------------------------------------------
// RunRequest / Target / RunReport
// ---------------------------------------------------------------------------

/// Inputs of one invocation.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub kind: OperationKind,
    pub org: String,
    pub project: String,
    pub selector: ConfigSelector,
    pub base_stack_name: String,
}

/// One environment paired with the stack it will operate on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    pub environment: String,
    pub stack: StackId,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub kind: OperationKind,
    /// Environments that matched the selector, in filter completion order.
    pub selected: Vec<String>,
    /// Successful operations, in completion order.
    pub results: Vec<OperationResult>,
    /// Environments whose operation failed.
    pub failed: Vec<String>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Table rows matching [`REPORT_HEADERS`]. Not sorted.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.results
            .iter()
            .map(|r| {
                vec![
                    r.stack.to_string(),
                    r.environment.clone(),
                    r.created.to_string(),
                    r.updated.to_string(),
                    r.destroyed.to_string(),
                ]
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives the enumerate → filter → resolve → execute pipeline against a
/// config store and a stack engine.
pub struct Orchestrator {
    store: Arc<dyn ConfigStore>,
    engine: Arc<dyn StackEngine>,
    sink: Arc<dyn DiagnosticSink>,
    settings: RunSettings,
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ConfigStore>, engine: Arc<dyn StackEngine>) -> Self {
        Self {
            store,
            engine,
            sink: Arc::new(TracingSink),
            settings: RunSettings::default(),
            ctx: RunContext::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.ctx = RunContext::new(self.ctx.cancel_token().clone(), settings.call_timeout);
        self.settings = settings;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.ctx = RunContext::new(cancel, self.settings.call_timeout);
        self
    }

    /// Run the whole pipeline. Setup failures (enumeration, stack indexing,
    /// ambiguous bindings, output directory) abort before any stack is
    /// touched; per-environment failures only shrink the report.
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let envs = self.list_environments(&request.org).await?;
        tracing::debug!(org = %request.org, count = envs.len(), "environments listed");

        let selected = self
            .filter_environments(&request.org, &envs, &request.selector)
            .await;
        tracing::debug!(selector = %request.selector, matched = selected.len(), "environments filtered");

        let index = self.build_stack_index(&selected).await?;
        let targets = resolve_stacks(
            &request.org,
            &request.project,
            &request.base_stack_name,
            &selected,
            &index,
        );

        let output_dir = self.prepare_output_dir(request.kind).await?;
        let (results, failed) = self.execute(request.kind, targets, &output_dir).await;

        Ok(RunReport {
            kind: request.kind,
            selected,
            results,
            failed,
        })
    }
}
