//! Collaborator traits the orchestrator drives.
//!
//! Implementations must be safe to call from many tasks at once; the
//! orchestrator shares one instance behind an `Arc` across every worker of a
//! stage.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::types::{ChangeSummary, StackHandle, StackId, StackSummary};
use crate::Result;

/// Destination for an operation's streamed progress output.
pub type OutputSink = dyn AsyncWrite + Send + Unpin;

/// Stores organization-scoped environments and their configuration.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Every environment name in `org`. An empty listing is not an error.
    async fn list_environments(&self, org: &str) -> Result<Vec<String>>;

    /// Resolved value at `path` (e.g. `pulumiConfig.tier`) in `org/env`.
    async fn get_config_value(&self, org: &str, env: &str, path: &str) -> Result<String>;
}

/// Computes and applies infrastructure changes for stacks.
#[async_trait]
pub trait StackEngine: Send + Sync {
    async fn list_stacks(&self) -> Result<Vec<StackSummary>>;

    /// Environments bound to `stack`. Accepts either a bare stack name from
    /// [`list_stacks`](StackEngine::list_stacks) or a fully-qualified name.
    async fn list_bound_environments(&self, stack: &str) -> Result<Vec<String>>;

    /// Create the stack if it does not exist. Idempotent.
    async fn upsert_stack(&self, stack: &StackId) -> Result<StackHandle>;

    async fn bind_environment(&self, stack: &str, env: &str) -> Result<()>;

    async fn preview(&self, stack: &StackHandle, sink: &mut OutputSink) -> Result<ChangeSummary>;

    async fn apply(&self, stack: &StackHandle, sink: &mut OutputSink) -> Result<ChangeSummary>;
}
