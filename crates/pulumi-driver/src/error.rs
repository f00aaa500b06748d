use paralumi_core::ParalumiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PulumiError {
    #[error("pulumi executable not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse pulumi output: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("pulumi {args} exited with code {code}")]
    Command {
        args: String,
        stdout: String,
        stderr: String,
        code: i32,
    },

    #[error("event log for {0} has no summary event")]
    MissingSummary(String),
}

impl From<PulumiError> for ParalumiError {
    fn from(err: PulumiError) -> Self {
        match err {
            PulumiError::Command {
                args,
                stdout,
                stderr,
                code,
            } => ParalumiError::Backend {
                message: format!("pulumi {args} failed"),
                stdout,
                stderr,
                code,
            },
            PulumiError::Io(e) => ParalumiError::Io(e),
            other => ParalumiError::Driver(other.to_string()),
        }
    }
}
