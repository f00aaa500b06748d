use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ParalumiError, Result};

// ---------------------------------------------------------------------------
// ConfigSelector
// ---------------------------------------------------------------------------

/// `key:value` pair used to pick environments. Parsed once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSelector {
    key: String,
    value: String,
}

impl ConfigSelector {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Parse `key:value`. Exactly one colon; neither side may be empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || ParalumiError::InvalidSelector(raw.to_string());
        let (key, value) = raw.split_once(':').ok_or_else(invalid)?;
        if key.is_empty() || value.is_empty() || value.contains(':') {
            return Err(invalid());
        }
        Ok(Self::new(key, value))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Path looked up in each environment definition.
    pub fn config_path(&self) -> String {
        format!("pulumiConfig.{}", self.key)
    }

    pub fn matches(&self, candidate: &str) -> bool {
        candidate == self.value
    }
}

impl fmt::Display for ConfigSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

impl std::str::FromStr for ConfigSelector {
    type Err = ParalumiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// StackId
// ---------------------------------------------------------------------------

/// Fully-qualified stack name: `org/project/stack`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId {
    pub org: String,
    pub project: String,
    pub stack: String,
}

impl StackId {
    pub fn new(org: impl Into<String>, project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            project: project.into(),
            stack: stack.into(),
        }
    }

    /// Identifier for a stack that does not exist yet: `{env}-{base}`.
    pub fn for_environment(org: &str, project: &str, env: &str, base: &str) -> Self {
        Self::new(org, project, format!("{env}-{base}"))
    }

    /// Identifier for a stack name reported by the backend. Names that are
    /// already `org/project/stack` are kept as they are.
    pub fn from_existing(org: &str, project: &str, name: &str) -> Self {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            [o, p, s] if !o.is_empty() && !p.is_empty() && !s.is_empty() => Self::new(*o, *p, *s),
            _ => Self::new(org, project, name),
        }
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.project, self.stack)
    }
}

impl Serialize for StackId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// StackSummary / StackHandle
// ---------------------------------------------------------------------------

/// One entry of the backend's stack listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSummary {
    pub name: String,
}

/// Proof that a stack exists in the backend; returned by `upsert_stack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackHandle {
    pub id: StackId,
}

// ---------------------------------------------------------------------------
// StackIndex
// ---------------------------------------------------------------------------

/// Environment → the single stack already bound to it.
///
/// Only constructible from raw bindings that have been checked: an
/// environment bound to two or more stacks is rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackIndex {
    bound: BTreeMap<String, String>,
}

impl StackIndex {
    pub fn from_bindings(bindings: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut bound = BTreeMap::new();
        for (environment, mut stacks) in bindings {
            match stacks.len() {
                0 => {}
                1 => {
                    bound.insert(environment, stacks.remove(0));
                }
                _ => {
                    return Err(ParalumiError::AmbiguousStacks {
                        environment,
                        stacks,
                    })
                }
            }
        }
        Ok(Self { bound })
    }

    pub fn stack_for(&self, env: &str) -> Option<&str> {
        self.bound.get(env).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Preview,
    Apply,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Preview => "preview",
            OperationKind::Apply => "apply",
        }
    }

    /// Directory the per-environment output files land in.
    pub fn output_dir(self) -> &'static str {
        match self {
            OperationKind::Preview => "preview-stdout",
            OperationKind::Apply => "apply-stdout",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ChangeSummary
// ---------------------------------------------------------------------------

/// Resource change counts keyed by operation type, as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSummary(BTreeMap<String, u64>);

impl ChangeSummary {
    pub fn count(&self, op: &str) -> u64 {
        self.0.get(op).copied().unwrap_or(0)
    }

    pub fn created(&self) -> u64 {
        self.count("create")
    }

    pub fn updated(&self) -> u64 {
        self.count("update")
    }

    /// Pulumi reports deletions as `delete`; other engines use `destroy`.
    pub fn destroyed(&self) -> u64 {
        self.count("destroy") + self.count("delete")
    }
}

impl From<BTreeMap<String, u64>> for ChangeSummary {
    fn from(counts: BTreeMap<String, u64>) -> Self {
        Self(counts)
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for ChangeSummary {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ---------------------------------------------------------------------------
// OperationResult
// ---------------------------------------------------------------------------

/// Outcome of one successful preview or apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub stack: StackId,
    pub environment: String,
    pub created: u64,
    pub updated: u64,
    pub destroyed: u64,
}

impl OperationResult {
    pub fn from_summary(stack: StackId, environment: impl Into<String>, summary: &ChangeSummary) -> Self {
        Self {
            stack,
            environment: environment.into(),
            created: summary.created(),
            updated: summary.updated(),
            destroyed: summary.destroyed(),
        }
    }
}
