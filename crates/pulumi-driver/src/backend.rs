use async_trait::async_trait;
use paralumi_core::{
    ChangeSummary, ConfigStore, OperationKind, OutputSink, StackEngine, StackHandle, StackId,
    StackSummary,
};

use crate::events::read_change_summary;
use crate::types::StackListEntry;
use crate::{PulumiCli, PulumiError, Result};

#[async_trait]
impl ConfigStore for PulumiCli {
    async fn list_environments(&self, org: &str) -> paralumi_core::Result<Vec<String>> {
        let stdout = self.run(&["env", "ls", "-o", org]).await?;
        Ok(parse_lines(&stdout))
    }

    async fn get_config_value(
        &self,
        org: &str,
        env: &str,
        path: &str,
    ) -> paralumi_core::Result<String> {
        let qualified = format!("{org}/{env}");
        let stdout = self
            .run(&["env", "get", &qualified, path, "--value", "json"])
            .await?;
        Ok(parse_config_value(&stdout)?)
    }
}

#[async_trait]
impl StackEngine for PulumiCli {
    async fn list_stacks(&self) -> paralumi_core::Result<Vec<StackSummary>> {
        let stdout = self.run(&["stack", "ls", "--json"]).await?;
        let entries: Vec<StackListEntry> = parse_json(&stdout)?.unwrap_or_default();
        Ok(entries
            .into_iter()
            .map(|e| StackSummary { name: e.name })
            .collect())
    }

    async fn list_bound_environments(&self, stack: &str) -> paralumi_core::Result<Vec<String>> {
        let stdout = self
            .run(&["config", "env", "ls", "--stack", stack, "--json"])
            .await?;
        Ok(parse_json::<Vec<String>>(&stdout)?.unwrap_or_default())
    }

    async fn upsert_stack(&self, stack: &StackId) -> paralumi_core::Result<StackHandle> {
        let fqsn = stack.to_string();
        self.run(&["stack", "select", "--create", "--stack", &fqsn, "--non-interactive"])
            .await?;
        Ok(StackHandle { id: stack.clone() })
    }

    async fn bind_environment(&self, stack: &str, env: &str) -> paralumi_core::Result<()> {
        self.run(&[
            "config",
            "env",
            "add",
            env,
            "--stack",
            stack,
            "--yes",
            "--non-interactive",
        ])
        .await?;
        Ok(())
    }

    async fn preview(
        &self,
        stack: &StackHandle,
        sink: &mut OutputSink,
    ) -> paralumi_core::Result<ChangeSummary> {
        Ok(self.operate(OperationKind::Preview, stack, sink).await?)
    }

    async fn apply(
        &self,
        stack: &StackHandle,
        sink: &mut OutputSink,
    ) -> paralumi_core::Result<ChangeSummary> {
        Ok(self.operate(OperationKind::Apply, stack, sink).await?)
    }
}

impl PulumiCli {
    /// `pulumi preview` / `pulumi up` with diff output streamed to `sink`
    /// and the change summary read back from a scratch event log.
    async fn operate(
        &self,
        kind: OperationKind,
        stack: &StackHandle,
        sink: &mut OutputSink,
    ) -> Result<ChangeSummary> {
        let scratch = tempfile::Builder::new().prefix("paralumi-").tempdir()?;
        let log = scratch.path().join("events.jsonl");
        let log_arg = log.to_string_lossy().into_owned();
        let fqsn = stack.id.to_string();

        let mut args = match kind {
            OperationKind::Preview => vec!["preview"],
            OperationKind::Apply => vec!["up", "--yes", "--skip-preview"],
        };
        args.extend([
            "--stack",
            fqsn.as_str(),
            "--diff",
            "--non-interactive",
            "--event-log",
            log_arg.as_str(),
        ]);

        self.run_streaming(&args, sink).await?;
        read_change_summary(&log, &fqsn).await
    }
}

/// One non-empty, trimmed line per item.
pub(crate) fn parse_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `None` for empty output or a JSON `null`.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(stdout: &str) -> Result<Option<T>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    serde_json::from_str::<Option<T>>(trimmed).map_err(|source| PulumiError::Parse {
        line: trimmed.to_owned(),
        source,
    })
}

/// Strings are returned as-is; numbers and booleans in their JSON form so
/// that `replicas:3` or `enabled:true` selectors can match.
pub(crate) fn parse_config_value(stdout: &str) -> Result<String> {
    let value: Option<serde_json::Value> = parse_json(stdout)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    })
}
