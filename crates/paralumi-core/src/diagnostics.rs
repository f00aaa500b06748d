//! Per-environment events raised while a stage runs.
//!
//! The orchestrator never prints. Anything a user should see about a single
//! environment (progress, a skipped lookup, a failed operation) is handed to
//! a [`DiagnosticSink`]; the CLI renders it, tests collect it.

use std::fmt;
use std::sync::Mutex;

use crate::types::{OperationKind, StackId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Config lookup for an environment failed; it is excluded from the run.
    LookupFailed {
        environment: String,
        key: String,
        error: String,
    },
    OperationStarted {
        kind: OperationKind,
        stack: StackId,
        environment: String,
    },
    /// Operation failed; the environment is left out of the report.
    OperationFailed {
        kind: OperationKind,
        stack: StackId,
        environment: String,
        error: String,
    },
    /// A worker task panicked or was aborted before reporting.
    TaskLost {
        stage: &'static str,
        environment: String,
        error: String,
    },
}

impl Diagnostic {
    pub fn is_failure(&self) -> bool {
        !matches!(self, Diagnostic::OperationStarted { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::LookupFailed {
                environment,
                key,
                error,
            } => write!(
                f,
                "failed to get config value {key} for environment {environment}: {}",
                one_line(error)
            ),
            Diagnostic::OperationStarted {
                kind,
                stack,
                environment,
            } => write!(f, "Running {kind} on stack {stack} in env {environment}..."),
            Diagnostic::OperationFailed {
                kind,
                stack,
                environment,
                error,
            } => write!(
                f,
                "{kind} failed for {stack} in environment {environment}: {}",
                one_line(error)
            ),
            Diagnostic::TaskLost {
                stage,
                environment,
                error,
            } => write!(
                f,
                "{stage} task for environment {environment} did not complete: {}",
                one_line(error)
            ),
        }
    }
}

fn one_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Receives diagnostics from concurrently running workers.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Forwards every diagnostic to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if diagnostic.is_failure() {
            tracing::warn!("{diagnostic}");
        } else {
            tracing::info!("{diagnostic}");
        }
    }
}

/// Keeps every diagnostic in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<Diagnostic> {
        self.events().into_iter().filter(Diagnostic::is_failure).collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Ok(mut events) = self.events.lock() {
            events.push(diagnostic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_message_fits_on_one_line() {
        let d = Diagnostic::OperationFailed {
            kind: OperationKind::Apply,
            stack: StackId::new("acme", "proj", "prod-release"),
            environment: "prod".into(),
            error: "pulumi up failed (exit code 255): error: \n  resource quota exceeded".into(),
        };
        let msg = d.to_string();
        assert!(!msg.contains('\n'));
        assert_eq!(
            msg,
            "apply failed for acme/proj/prod-release in environment prod: \
             pulumi up failed (exit code 255): error: resource quota exceeded"
        );
    }

    #[test]
    fn lost_task_names_its_environment() {
        let d = Diagnostic::TaskLost {
            stage: "apply",
            environment: "prod".into(),
            error: "task 14 panicked with message \"engine bug\"".into(),
        };
        assert!(d.is_failure());
        assert_eq!(
            d.to_string(),
            "apply task for environment prod did not complete: \
             task 14 panicked with message \"engine bug\""
        );
    }

    #[test]
    fn collecting_sink_separates_failures() {
        let sink = CollectingSink::new();
        sink.emit(Diagnostic::OperationStarted {
            kind: OperationKind::Preview,
            stack: StackId::new("acme", "proj", "dev-release"),
            environment: "dev".into(),
        });
        sink.emit(Diagnostic::LookupFailed {
            environment: "qa".into(),
            key: "tier".into(),
            error: "key not found".into(),
        });
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.failures().len(), 1);
    }
}
