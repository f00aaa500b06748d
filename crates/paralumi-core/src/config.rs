use crate::error::{ParalumiError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "paralumi.yaml";
const PROJECT_FILES: &[&str] = &["Pulumi.yaml", "Pulumi.yml"];

// ---------------------------------------------------------------------------
// FileConfig
// ---------------------------------------------------------------------------

/// Optional `paralumi.yaml` in the working directory. Every field may be
/// overridden from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on_partial_failure: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulumi_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_root: Option<PathBuf>,
}

impl FileConfig {
    /// Load `paralumi.yaml` from `dir`. A missing file yields the defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: FileConfig =
            serde_yaml::from_str(&data).map_err(|e| ParalumiError::Config {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        if config.max_concurrency == Some(0) {
            return Err(ParalumiError::Config {
                path,
                reason: "max_concurrency must be at least 1".into(),
            });
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// RunSettings
// ---------------------------------------------------------------------------

/// Knobs for one orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Upper bound on in-flight tasks per stage. `None` is unbounded.
    pub max_concurrency: Option<usize>,
    /// Limit on any single backend call. `None` waits indefinitely.
    pub call_timeout: Option<Duration>,
    /// Exit non-zero when any environment's operation failed.
    pub fail_on_partial_failure: bool,
    /// Directory the `<kind>-stdout/` folders are created in.
    pub output_root: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            call_timeout: None,
            fail_on_partial_failure: false,
            output_root: PathBuf::from("."),
        }
    }
}

impl RunSettings {
    /// Settings from a loaded config file; a relative `output_root` is taken
    /// relative to `dir`.
    pub fn from_file(dir: &Path, file: &FileConfig) -> Self {
        let output_root = match &file.output_root {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => dir.join(p),
            None => dir.to_path_buf(),
        };
        Self {
            max_concurrency: file.max_concurrency,
            call_timeout: file.call_timeout_secs.map(Duration::from_secs),
            fail_on_partial_failure: file.fail_on_partial_failure.unwrap_or(false),
            output_root,
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectSettings
// ---------------------------------------------------------------------------

/// The subset of `Pulumi.yaml` paralumi needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectSettings {
    pub name: String,
}

impl ProjectSettings {
    pub fn load(dir: &Path) -> Result<Self> {
        let path = PROJECT_FILES
            .iter()
            .map(|f| dir.join(f))
            .find(|p| p.exists())
            .ok_or_else(|| ParalumiError::ProjectNotFound(dir.to_path_buf()))?;
        let data = std::fs::read_to_string(&path)?;
        let settings: ProjectSettings = serde_yaml::from_str(&data)?;
        if settings.name.trim().is_empty() {
            return Err(ParalumiError::Config {
                path,
                reason: "project name is empty".into(),
            });
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_file_is_default() {
        let dir = TempDir::new().unwrap();
        assert_eq!(FileConfig::load(dir.path()).unwrap(), FileConfig::default());
    }

    #[test]
    fn config_file_fields_flow_into_settings() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "max_concurrency: 4\ncall_timeout_secs: 600\nfail_on_partial_failure: true\noutput_root: out\n",
        )
        .unwrap();
        let file = FileConfig::load(dir.path()).unwrap();
        let settings = RunSettings::from_file(dir.path(), &file);
        assert_eq!(settings.max_concurrency, Some(4));
        assert_eq!(settings.call_timeout, Some(Duration::from_secs(600)));
        assert!(settings.fail_on_partial_failure);
        assert_eq!(settings.output_root, dir.path().join("out"));
    }

    #[test]
    fn unknown_config_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "parallelism: 3\n").unwrap();
        let err = FileConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ParalumiError::Config { .. }));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "max_concurrency: 0\n").unwrap();
        assert!(FileConfig::load(dir.path()).is_err());
    }

    #[test]
    fn project_name_read_from_pulumi_yaml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Pulumi.yaml"),
            "name: proj\nruntime: nodejs\ndescription: example\n",
        )
        .unwrap();
        assert_eq!(ProjectSettings::load(dir.path()).unwrap().name, "proj");
    }

    #[test]
    fn missing_project_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = ProjectSettings::load(dir.path()).unwrap_err();
        assert!(matches!(err, ParalumiError::ProjectNotFound(_)));
    }
}
