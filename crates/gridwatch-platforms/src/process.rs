//! Bounded external command execution.
//!
//! Every status tool runs through [`run_bounded`]: the child is spawned with
//! `kill_on_drop`, its wait is wrapped in a timeout, and on expiry the child
//! is killed before `AdapterError::Timeout` is returned.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use gridwatch_core::AdapterError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert a failed run into `NonZeroExit`.
    pub fn into_failure(self) -> AdapterError {
        let stderr = self.stderr.trim().to_string();
        AdapterError::NonZeroExit {
            code: self.code,
            stderr: if stderr.is_empty() {
                "Command failed with non-zero exit code".into()
            } else {
                stderr
            },
        }
    }
}

/// Run `program args…` and wait at most `timeout` for it to finish.
///
/// A non-zero exit is NOT an error here; callers decide what exit codes mean
/// (`pgrep` uses 1 for "no match").
pub async fn run_bounded(program: &Path, args: &[&str], timeout: Duration) -> Result<CommandOutput, AdapterError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_error(program, e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let finished = tokio::time::timeout(timeout, async {
        let (out, err, status) = tokio::join!(read_pipe(stdout), read_pipe(stderr), child.wait());
        status.map(|s| (s, out, err))
    })
    .await;

    match finished {
        Ok(Ok((status, stdout, stderr))) => Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        }),
        Ok(Err(e)) => Err(AdapterError::NonZeroExit {
            code: None,
            stderr: format!("failed waiting for {}: {e}", program.display()),
        }),
        Err(_) => {
            if let Err(e) = child.kill().await {
                tracing::warn!("⚠️ Failed to kill timed-out {}: {e}", program.display());
            }
            tracing::warn!("⏱️ {} timed out after {}s", program.display(), timeout.as_secs());
            Err(AdapterError::Timeout {
                secs: timeout.as_secs().max(1),
            })
        }
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe
        && let Err(e) = pipe.read_to_end(&mut buf).await
    {
        tracing::debug!("pipe read error: {e}");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn spawn_error(program: &Path, e: std::io::Error) -> AdapterError {
    match e.kind() {
        std::io::ErrorKind::NotFound => AdapterError::NotInstalled(format!("{} not found", program.display())),
        std::io::ErrorKind::PermissionDenied => AdapterError::NotInstalled(format!(
            "Permission denied executing {}. Try: chmod +x {} or check file ownership.",
            program.display(),
            program.display()
        )),
        _ => AdapterError::NonZeroExit {
            code: None,
            stderr: format!("Error executing {}: {e}", program.display()),
        },
    }
}

/// Resolve a tool binary: explicit path, then `PATH`, then `fallback_dirs`.
pub fn locate_binary(name: &str, explicit: Option<&Path>, fallback_dirs: &[PathBuf]) -> Result<PathBuf, AdapterError> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(AdapterError::NotInstalled(format!("{name} binary not found at {}", path.display())));
    }

    let path_dirs = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
        .unwrap_or_default();

    path_dirs
        .iter()
        .chain(fallback_dirs.iter())
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            AdapterError::NotInstalled(format!(
                "{name} command not found. Please ensure it is installed and in PATH."
            ))
        })
}

/// Fail with an actionable message when `path` lacks execute bits.
#[cfg(unix)]
pub fn ensure_executable(path: &Path) -> Result<(), AdapterError> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path)
        .map_err(|_| AdapterError::NotInstalled(format!("binary not found at {}", path.display())))?;
    if meta.permissions().mode() & 0o111 == 0 {
        return Err(AdapterError::NotInstalled(format!(
            "{} does not have execute permissions. Run: chmod +x {}",
            path.display(),
            path.display()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_executable(path: &Path) -> Result<(), AdapterError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AdapterError::NotInstalled(format!("binary not found at {}", path.display())))
    }
}
