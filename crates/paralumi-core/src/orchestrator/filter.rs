use std::sync::Arc;

use super::group::TaskGroup;
use super::Orchestrator;
use crate::diagnostics::Diagnostic;
use crate::types::ConfigSelector;
use crate::Result;

impl Orchestrator {
    /// Every environment name in `org`, blanks dropped.
    pub async fn list_environments(&self, org: &str) -> Result<Vec<String>> {
        let envs = self
            .ctx
            .call("list environments", self.store.list_environments(org))
            .await?;
        Ok(envs
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect())
    }

    /// Environments whose `pulumiConfig.<key>` equals the selector's value.
    ///
    /// One lookup task per environment. A failed lookup is reported to the
    /// diagnostic sink and the environment is dropped. The returned order is
    /// the order lookups finished in.
    pub async fn filter_environments(
        &self,
        org: &str,
        envs: &[String],
        selector: &ConfigSelector,
    ) -> Vec<String> {
        let path = selector.config_path();
        let mut group = TaskGroup::new(self.settings.max_concurrency);

        for env in envs {
            let store = Arc::clone(&self.store);
            let sink = Arc::clone(&self.sink);
            let ctx = self.ctx.clone();
            let selector = selector.clone();
            let org = org.to_string();
            let env = env.clone();
            let path = path.clone();

            group.spawn(env.clone(), async move {
                let lookup = ctx
                    .call("get config value", store.get_config_value(&org, &env, &path))
                    .await;
                match lookup {
                    Ok(value) if selector.matches(&value) => Some(env),
                    Ok(value) => {
                        tracing::debug!(env = %env, value = %value, "config value does not match");
                        None
                    }
                    Err(e) => {
                        sink.emit(Diagnostic::LookupFailed {
                            environment: env,
                            key: selector.key().to_string(),
                            error: e.to_string(),
                        });
                        None
                    }
                }
            });
        }

        let (done, lost) = group.join().await;
        for task in lost {
            self.sink.emit(Diagnostic::TaskLost {
                stage: "config filter",
                environment: task.key,
                error: task.error,
            });
        }
        done.into_iter().flatten().collect()
    }
}
