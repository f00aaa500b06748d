//! `pulumi-driver` — drives the `pulumi` CLI as a subprocess so that
//! `paralumi-core` can treat Pulumi Cloud as its config store and stack
//! engine.
//!
//! # Architecture
//!
//! ```text
//! PulumiCli            ← executable path + working directory
//!     │
//!     ├── run()        ← captured stdout/stderr, error on non-zero exit
//!     │
//!     └── run_streaming()
//!             │          stdout copied into the caller's sink as it arrives
//!             ▼
//!         event log    ← `--event-log <tmp>`; the summaryEvent carries the
//!                        resource change counts
//! ```
//!
//! Every child is spawned with `kill_on_drop`, so dropping an in-flight call
//! (cancellation, timeout) also stops the subprocess.

mod backend;
pub mod error;
mod events;
pub(crate) mod process;
pub mod types;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};

pub use error::PulumiError;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, PulumiError>;

/// Handle on a `pulumi` executable run from one project directory.
#[derive(Debug, Clone)]
pub struct PulumiCli {
    exe: PathBuf,
    work_dir: PathBuf,
}

impl PulumiCli {
    pub fn new(exe: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            exe: exe.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Use `explicit` if given, otherwise look `pulumi` up on `PATH`.
    pub fn locate(explicit: Option<&Path>, work_dir: impl Into<PathBuf>) -> Result<Self> {
        let exe = match explicit {
            Some(p) => p.to_path_buf(),
            None => which::which("pulumi")
                .map_err(|e| PulumiError::NotFound(format!("pulumi on PATH ({e})")))?,
        };
        if explicit.is_some() && !exe.exists() && which::which(&exe).is_err() {
            return Err(PulumiError::NotFound(exe.display().to_string()));
        }
        Ok(Self::new(exe, work_dir))
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }
}
