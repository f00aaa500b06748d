use std::collections::{BTreeMap, HashSet};

use super::{Orchestrator, Target};
use crate::types::{StackId, StackIndex};
use crate::Result;

impl Orchestrator {
    /// Map each candidate environment to the stacks already bound to it.
    ///
    /// Lists every stack once and asks for its bound environments one stack
    /// at a time. Bindings to environments outside `envs` are ignored. Any
    /// backend failure here is fatal, as is an environment bound to more than
    /// one stack.
    pub async fn build_stack_index(&self, envs: &[String]) -> Result<StackIndex> {
        let candidates: HashSet<&str> = envs.iter().map(String::as_str).collect();
        let stacks = self
            .ctx
            .call("list stacks", self.engine.list_stacks())
            .await?;

        let mut bindings: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for summary in stacks {
            let bound = self
                .ctx
                .call(
                    "list stack environments",
                    self.engine.list_bound_environments(&summary.name),
                )
                .await?;
            for env in bound {
                if !candidates.contains(env.as_str()) {
                    continue;
                }
                let stacks = bindings.entry(env).or_default();
                if !stacks.contains(&summary.name) {
                    stacks.push(summary.name.clone());
                }
            }
        }

        let index = StackIndex::from_bindings(bindings)?;
        tracing::debug!(bound = index.len(), candidates = envs.len(), "stack index built");
        Ok(index)
    }
}

/// Pick the stack each environment operates on: its existing stack if it has
/// one, otherwise a new `{env}-{base}` stack.
pub fn resolve_stacks(
    org: &str,
    project: &str,
    base_stack_name: &str,
    envs: &[String],
    index: &StackIndex,
) -> Vec<Target> {
    envs.iter()
        .map(|env| {
            let stack = match index.stack_for(env) {
                Some(existing) => StackId::from_existing(org, project, existing),
                None => StackId::for_environment(org, project, env, base_stack_name),
            };
            Target {
                environment: env.clone(),
                stack,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_envs_get_new_stacks() {
        let envs = vec!["dev".to_string(), "prod".to_string()];
        let targets = resolve_stacks("acme", "proj", "release", &envs, &StackIndex::default());
        let names: Vec<String> = targets.iter().map(|t| t.stack.to_string()).collect();
        assert_eq!(names, vec!["acme/proj/dev-release", "acme/proj/prod-release"]);
    }

    #[test]
    fn bound_env_reuses_existing_stack() {
        let mut bindings = BTreeMap::new();
        bindings.insert("dev".to_string(), vec!["legacy".to_string()]);
        let index = StackIndex::from_bindings(bindings).unwrap();
        let envs = vec!["dev".to_string(), "prod".to_string()];
        let targets = resolve_stacks("acme", "proj", "release", &envs, &index);
        assert_eq!(targets[0].environment, "dev");
        assert_eq!(targets[0].stack.stack, "legacy");
        assert_eq!(targets[1].stack.stack, "prod-release");
    }
}
