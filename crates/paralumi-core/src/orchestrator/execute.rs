use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;

use super::group::TaskGroup;
use super::{Orchestrator, Target};
use crate::backend::StackEngine;
use crate::cancel::RunContext;
use crate::diagnostics::Diagnostic;
use crate::error::{ParalumiError, Result};
use crate::types::{OperationKind, OperationResult};

impl Orchestrator {
    /// Create `<output_root>/<kind>-stdout/`. An existing directory is fine.
    pub async fn prepare_output_dir(&self, kind: OperationKind) -> Result<PathBuf> {
        let dir = self.settings.output_root.join(kind.output_dir());
        match tokio::fs::create_dir(&dir).await {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(dir),
            Err(source) => Err(ParalumiError::OutputDir { path: dir, source }),
        }
    }

    /// Run `kind` against every target concurrently.
    ///
    /// Returns the successful results in completion order and the names of
    /// environments whose operation failed. A failure is reported to the
    /// diagnostic sink and never stops sibling targets.
    pub async fn execute(
        &self,
        kind: OperationKind,
        targets: Vec<Target>,
        output_dir: &Path,
    ) -> (Vec<OperationResult>, Vec<String>) {
        let mut group = TaskGroup::new(self.settings.max_concurrency);

        for target in targets {
            let engine = Arc::clone(&self.engine);
            let sink = Arc::clone(&self.sink);
            let ctx = self.ctx.clone();
            let output_file = output_dir.join(output_file_name(&target.environment));

            group.spawn(target.environment.clone(), async move {
                sink.emit(Diagnostic::OperationStarted {
                    kind,
                    stack: target.stack.clone(),
                    environment: target.environment.clone(),
                });
                match run_one(&ctx, engine.as_ref(), kind, &target, &output_file).await {
                    Ok(result) => Ok(result),
                    Err(e) => {
                        sink.emit(Diagnostic::OperationFailed {
                            kind,
                            stack: target.stack.clone(),
                            environment: target.environment.clone(),
                            error: e.to_string(),
                        });
                        Err(target.environment)
                    }
                }
            });
        }

        let (done, lost) = group.join().await;

        let mut results = Vec::with_capacity(done.len());
        let mut failed = Vec::new();
        for task in lost {
            self.sink.emit(Diagnostic::TaskLost {
                stage: kind.as_str(),
                environment: task.key.clone(),
                error: task.error,
            });
            failed.push(task.key);
        }
        for outcome in done {
            match outcome {
                Ok(result) => results.push(result),
                Err(env) => failed.push(env),
            }
        }
        (results, failed)
    }
}

/// The sequential steps for one environment: ensure stack, ensure binding,
/// run with output captured to this environment's file.
async fn run_one(
    ctx: &RunContext,
    engine: &dyn StackEngine,
    kind: OperationKind,
    target: &Target,
    output_file: &Path,
) -> Result<OperationResult> {
    let env = target.environment.as_str();
    let handle = ctx
        .call("upsert stack", engine.upsert_stack(&target.stack))
        .await?;

    let fqsn = target.stack.to_string();
    let bound = ctx
        .call("list stack environments", engine.list_bound_environments(&fqsn))
        .await?;
    if !bound.iter().any(|e| e == env) {
        ctx.call("add stack environment", engine.bind_environment(&fqsn, env))
            .await?;
    }

    let mut file = tokio::fs::File::create(output_file).await?;
    let summary = match kind {
        OperationKind::Preview => ctx.call("preview", engine.preview(&handle, &mut file)).await?,
        OperationKind::Apply => ctx.call("apply", engine.apply(&handle, &mut file)).await?,
    };
    file.flush().await?;

    Ok(OperationResult::from_summary(
        target.stack.clone(),
        env,
        &summary,
    ))
}

/// Environment names may carry `/` (project-scoped environments). Separators
/// and `%` are percent-encoded so every environment gets its own file directly
/// inside the output directory.
fn output_file_name(env: &str) -> String {
    let mut name = String::with_capacity(env.len());
    for c in env.chars() {
        match c {
            '%' => name.push_str("%25"),
            '/' => name.push_str("%2F"),
            '\\' => name.push_str("%5C"),
            _ => name.push(c),
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_file_name_encodes_separators() {
        assert_eq!(output_file_name("dev"), "dev");
        assert_eq!(output_file_name("infra/dev"), "infra%2Fdev");
        assert_eq!(output_file_name("win\\dev"), "win%5Cdev");
        assert_eq!(output_file_name("100%"), "100%25");
    }

    #[test]
    fn output_file_names_never_collide() {
        let envs = ["infra/dev", "infra_dev", "infra%2Fdev", "infra\\dev", "infra%dev"];
        let names: std::collections::HashSet<String> =
            envs.iter().map(|e| output_file_name(e)).collect();
        assert_eq!(names.len(), envs.len());
    }
}
