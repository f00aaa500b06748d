/// Subprocess tests. `sh` stands in for `pulumi`, either directly or through
/// a small script that answers the handful of commands paralumi issues.
#[cfg(all(test, unix))]
mod unit {
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    use paralumi_core::{ConfigStore, ParalumiError, StackEngine, StackHandle, StackId};
    use tempfile::TempDir;

    use crate::{PulumiCli, PulumiError};

    const FAKE_PULUMI: &str = r#"#!/bin/sh
log=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--event-log" ]; then log="$a"; fi
  prev="$a"
done
case "$1" in
  env)
    case "$2" in
      ls) printf 'dev\nstaging\n\nprod\n' ;;
      get)
        if [ "$3" = "acme/dev" ]; then echo '"blue"'; else echo "error: no value at $4" >&2; exit 1; fi ;;
    esac ;;
  preview)
    echo "Previewing update ($3)"
    echo '{"sequence":3,"summaryEvent":{"maybeCorrupt":false,"durationSeconds":1,"resourceChanges":{"create":2,"delete":1}}}' > "$log"
    ;;
  up)
    echo "Updating ($5)"
    echo "error: update failed" >&2
    exit 255 ;;
  *)
    echo "unexpected: $*" >&2
    exit 2 ;;
esac
"#;

    fn sh(dir: &TempDir) -> PulumiCli {
        PulumiCli::new("sh", dir.path())
    }

    fn fake_pulumi(dir: &TempDir) -> PulumiCli {
        let path: PathBuf = dir.path().join("pulumi");
        std::fs::write(&path, FAKE_PULUMI).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        PulumiCli::new(path, dir.path())
    }

    fn handle(stack: &str) -> StackHandle {
        StackHandle {
            id: StackId::new("acme", "proj", stack),
        }
    }

    #[tokio::test]
    async fn run_returns_stdout_on_success() {
        let dir = TempDir::new().unwrap();
        let out = sh(&dir)
            .run(&["-c", "echo out; echo noise >&2"])
            .await
            .unwrap();
        assert_eq!(out, "out\n");
    }

    #[tokio::test]
    async fn run_failure_carries_streams_and_code() {
        let dir = TempDir::new().unwrap();
        let err = sh(&dir)
            .run(&["-c", "echo partial; echo boom >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            PulumiError::Command {
                stdout,
                stderr,
                code,
                ..
            } => {
                assert_eq!(stdout, "partial\n");
                assert_eq!(stderr, "boom\n");
                assert_eq!(code, 3);
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_uses_the_working_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Pulumi.yaml"), "name: proj\n").unwrap();
        let out = sh(&dir).run(&["-c", "cat Pulumi.yaml"]).await.unwrap();
        assert_eq!(out, "name: proj\n");
    }

    #[tokio::test]
    async fn streaming_copies_stdout_into_sink() {
        let dir = TempDir::new().unwrap();
        let mut sink: Vec<u8> = Vec::new();
        sh(&dir)
            .run_streaming(&["-c", "echo line1; echo line2; echo hidden >&2"], &mut sink)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(sink).unwrap(), "line1\nline2\n");
    }

    #[tokio::test]
    async fn streaming_failure_keeps_transcript() {
        let dir = TempDir::new().unwrap();
        let mut sink: Vec<u8> = Vec::new();
        let err = sh(&dir)
            .run_streaming(&["-c", "echo step; echo broke >&2; exit 1"], &mut sink)
            .await
            .unwrap_err();
        assert_eq!(String::from_utf8(sink).unwrap(), "step\n");
        assert!(matches!(
            err,
            PulumiError::Command { ref stdout, ref stderr, code: 1, .. }
                if stdout == "step\n" && stderr == "broke\n"
        ));
    }

    #[tokio::test]
    async fn fake_pulumi_lists_and_reads_environments() {
        let dir = TempDir::new().unwrap();
        let cli = fake_pulumi(&dir);

        let envs = cli.list_environments("acme").await.unwrap();
        assert_eq!(envs, vec!["dev", "staging", "prod"]);

        let value = cli
            .get_config_value("acme", "dev", "pulumiConfig.tier")
            .await
            .unwrap();
        assert_eq!(value, "blue");

        let err = cli
            .get_config_value("acme", "prod", "pulumiConfig.tier")
            .await
            .unwrap_err();
        match err {
            ParalumiError::Backend { stderr, code, .. } => {
                assert_eq!(code, 1);
                assert!(stderr.contains("pulumiConfig.tier"));
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fake_pulumi_preview_streams_and_summarizes() {
        let dir = TempDir::new().unwrap();
        let cli = fake_pulumi(&dir);
        let mut sink: Vec<u8> = Vec::new();

        let summary = cli
            .preview(&handle("dev-release"), &mut sink)
            .await
            .unwrap();
        assert_eq!(summary.created(), 2);
        assert_eq!(summary.updated(), 0);
        assert_eq!(summary.destroyed(), 1);
        assert_eq!(
            String::from_utf8(sink).unwrap(),
            "Previewing update (acme/proj/dev-release)\n"
        );
    }

    #[tokio::test]
    async fn fake_pulumi_failed_apply_is_a_backend_error() {
        let dir = TempDir::new().unwrap();
        let cli = fake_pulumi(&dir);
        let mut sink: Vec<u8> = Vec::new();

        let err = cli
            .apply(&handle("prod-release"), &mut sink)
            .await
            .unwrap_err();
        match err {
            ParalumiError::Backend {
                stdout,
                stderr,
                code,
                ..
            } => {
                assert_eq!(code, 255);
                assert_eq!(stdout, "Updating (acme/proj/prod-release)\n");
                assert!(stderr.contains("update failed"));
            }
            other => panic!("expected Backend error, got {other:?}"),
        }
    }

    #[test]
    fn locate_rejects_missing_explicit_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no-such-pulumi");
        let err = PulumiCli::locate(Some(missing.as_path()), dir.path()).unwrap_err();
        assert!(matches!(err, PulumiError::NotFound(_)));
    }
}
