use crate::pipeline::ShellFlavor;
use anyhow::Context;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// Captured result of one shell invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

impl StepOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Backend trait: run one rendered command line and capture its output.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn run(
        &self,
        cmd: &str,
        cwd: &Path,
        env: &[(String, String)],
        timeout_secs: Option<u64>,
    ) -> anyhow::Result<StepOutput>;
}

/// Local backend: runs in the host shell (PowerShell on Windows, sh on Unix).
/// The child inherits the process environment plus `env`.
pub struct LocalBackend {
    flavor: ShellFlavor,
}

impl LocalBackend {
    pub fn new(flavor: ShellFlavor) -> Self {
        Self { flavor }
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(ShellFlavor::host())
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn run(
        &self,
        cmd: &str,
        cwd: &Path,
        env: &[(String, String)],
        timeout_secs: Option<u64>,
    ) -> anyhow::Result<StepOutput> {
        let mut c = Command::new(self.flavor.program());
        c.args(self.flavor.program_args())
            .arg(cmd)
            .current_dir(cwd)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = c
            .spawn()
            .with_context(|| format!("local backend failed to spawn {}", self.flavor.program()))?;

        let output = match timeout_secs {
            Some(secs) => {
                // Dropping the timed-out future drops the child, which kills it.
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
                    Ok(res) => res.context("waiting for child failed")?,
                    Err(_) => anyhow::bail!("local backend timed out after {}s", secs),
                }
            }
            None => child
                .wait_with_output()
                .await
                .context("waiting for child failed")?,
        };

        Ok(StepOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}

/// Logs commands instead of running them. Every command succeeds.
#[derive(Default)]
pub struct DryRunBackend {
    seen: Mutex<Vec<String>>,
}

impl DryRunBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands received so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Backend for DryRunBackend {
    async fn run(
        &self,
        cmd: &str,
        _cwd: &Path,
        _env: &[(String, String)],
        _timeout_secs: Option<u64>,
    ) -> anyhow::Result<StepOutput> {
        info!("dry run, not executing");
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(cmd.to_string());
        }
        Ok(StepOutput {
            exit_code: Some(0),
            ..StepOutput::default()
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_backend_captures_output_and_env() {
        let backend = LocalBackend::new(ShellFlavor::Posix);
        let env = vec![("ARTIPIPE_TEST_VALUE".to_string(), "xyz".to_string())];
        let out = backend
            .run("echo $ARTIPIPE_TEST_VALUE; echo oops >&2; exit 3", Path::new("."), &env, None)
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "xyz");
        assert_eq!(out.stderr.trim(), "oops");
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
    }

    #[tokio::test]
    async fn local_backend_times_out() {
        let backend = LocalBackend::new(ShellFlavor::Posix);
        let err = backend
            .run("sleep 5", Path::new("."), &[], Some(1))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn dry_run_records_commands() {
        let backend = DryRunBackend::new();
        let out = backend.run("jfrog rt build-clean a 1", Path::new("."), &[], None).await.unwrap();
        assert!(out.success());
        assert_eq!(backend.commands(), vec!["jfrog rt build-clean a 1"]);
    }
}
