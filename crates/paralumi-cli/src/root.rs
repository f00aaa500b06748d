use std::path::{Path, PathBuf};

/// Resolve the Pulumi project directory.
///
/// Priority:
/// 1. `--work-dir` flag / `PARALUMI_WORK_DIR` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `Pulumi.yaml`
/// 3. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_project_dir(&cwd).unwrap_or(cwd)
}

fn find_project_dir(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join("Pulumi.yaml").is_file() || dir.join("Pulumi.yml").is_file() {
            return Some(dir);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}
