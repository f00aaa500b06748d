use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParalumiError {
    #[error("invalid config selector '{0}': expected <key>:<value>")]
    InvalidSelector(String),

    /// A backend invocation ran and failed. The captured streams are kept
    /// for diagnosis; only stderr is part of the one-line message.
    #[error("{message} (exit code {code}){}", stderr_suffix(.stderr))]
    Backend {
        message: String,
        stdout: String,
        stderr: String,
        code: i32,
    },

    #[error("{0}")]
    Driver(String),

    #[error(
        "multiple existing stacks {stacks:?} in environment {environment}: \
         paralumi requires one stack per environment"
    )]
    AmbiguousStacks {
        environment: String,
        stacks: Vec<String>,
    },

    #[error("{call} cancelled")]
    Cancelled { call: String },

    #[error("{call} timed out after {after:?}")]
    Timeout { call: String, after: std::time::Duration },

    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    #[error("no Pulumi.yaml found in {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

pub type Result<T> = std::result::Result<T, ParalumiError>;
