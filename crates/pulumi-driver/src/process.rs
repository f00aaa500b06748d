use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::{PulumiCli, PulumiError, Result};

// ─── Command builder ──────────────────────────────────────────────────────

impl PulumiCli {
    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.exe);
        cmd.args(args)
            .current_dir(&self.work_dir)
            // No update banner on stderr.
            .env("PULUMI_SKIP_UPDATE_CHECK", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    // ─── Captured ─────────────────────────────────────────────────────────

    /// Run to completion and return stdout. A non-zero exit becomes
    /// [`PulumiError::Command`] carrying both streams and the exit code.
    pub(crate) async fn run(&self, args: &[&str]) -> Result<String> {
        tracing::debug!(argv = ?args, "running pulumi");
        let output = self.command(args).output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(PulumiError::Command {
                args: args.join(" "),
                stdout,
                stderr,
                code: output.status.code().unwrap_or(-1),
            });
        }
        Ok(stdout)
    }

    // ─── Streaming ────────────────────────────────────────────────────────

    /// Run to completion while copying stdout into `sink` as it arrives.
    /// Stderr is captured and only surfaced on failure.
    pub(crate) async fn run_streaming<W>(&self, args: &[&str], sink: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        tracing::debug!(argv = ?args, "running pulumi (streaming)");
        let mut child = self.command(args).spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PulumiError::Io(std::io::Error::other("stdout not captured")))?;
        let stderr = child.stderr.take();

        let (transcript, stderr) = tokio::try_join!(tee(stdout, sink), drain(stderr))?;
        let status = child.wait().await?;

        if !status.success() {
            return Err(PulumiError::Command {
                args: args.join(" "),
                stdout: String::from_utf8_lossy(&transcript).into_owned(),
                stderr,
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

/// Copy `reader` into `sink`, keeping a copy of everything written.
async fn tee<R, W>(mut reader: R, sink: &mut W) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut transcript = Vec::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        transcript.extend_from_slice(&buf[..n]);
    }
    sink.flush().await?;
    Ok(transcript)
}

async fn drain<R: AsyncRead + Unpin>(reader: Option<R>) -> std::io::Result<String> {
    let mut bytes = Vec::new();
    if let Some(mut r) = reader {
        r.read_to_end(&mut bytes).await?;
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
