//! Process-backed launcher implementation.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::job::Job;

use super::config::LauncherConfig;
use super::error::JobError;
use super::priority::demote_to_idle;
use super::traits::Launcher;
use super::types::{JobExit, JobHandle};

const READ_CHUNK: usize = 8 * 1024;

/// Runs each job as an OS process.
pub struct ProcessLauncher {
    config: LauncherConfig,
}

impl ProcessLauncher {
    /// Creates a new launcher with the given configuration.
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    /// Creates a launcher with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(LauncherConfig::default())
    }

    fn demote(&self, job: &Job, pid: Option<u32>) {
        if !self.config.demote_priority {
            return;
        }
        let Some(pid) = pid else {
            warn!(job = %job.id(), "Process exited before priority demotion");
            return;
        };
        match demote_to_idle(pid) {
            Ok(()) => trace!(job = %job.id(), pid, "Demoted to idle priority"),
            Err(e) => warn!(job = %job.id(), pid, error = %e, "Failed to demote priority"),
        }
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    fn name(&self) -> &str {
        "process"
    }

    async fn launch(&self, job: &Job) -> Result<JobHandle, JobError> {
        trace!(job = %job.id(), program = %job.program.display(), args = ?job.args, "spawn");

        let child = Command::new(&job.program)
            .args(&job.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| JobError::launch(&job.program, e))?;

        let pid = child.id();
        self.demote(job, pid);

        debug!(job = %job.id(), ?pid, "Job started");

        let limit = self.config.timeout;
        let capture_bytes = self.config.capture_bytes;
        let task = tokio::spawn(supervise(child, limit, capture_bytes));

        Ok(JobHandle::new(job.id(), pid, task))
    }
}

/// Waits for `child`, draining its output, and kills it if `limit` elapses.
async fn supervise(
    mut child: Child,
    limit: Option<Duration>,
    capture_bytes: usize,
) -> Result<JobExit, JobError> {
    let start = Instant::now();

    let stdout = child
        .stdout
        .take()
        .map(|s| tokio::spawn(drain(s, capture_bytes)));
    let stderr = child
        .stderr
        .take()
        .map(|s| tokio::spawn(drain(s, capture_bytes)));

    let status = match limit {
        Some(limit) => match timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                let _ = child.kill().await;
                return Err(JobError::TimedOut {
                    timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                });
            }
        },
        None => child.wait().await,
    }
    .map_err(|e| JobError::Wait(e.to_string()))?;

    Ok(JobExit {
        code: status.code(),
        stdout: collect(stdout).await,
        stderr: collect(stderr).await,
        elapsed: start.elapsed(),
    })
}

/// Reads `stream` to the end, keeping only its last `cap` bytes.
async fn drain<R: AsyncRead + Unpin>(mut stream: R, cap: usize) -> Vec<u8> {
    let mut kept = VecDeque::with_capacity(cap.min(READ_CHUNK));
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                kept.extend(&chunk[..n]);
                let excess = kept.len().saturating_sub(cap);
                kept.drain(..excess);
            }
        }
    }
    kept.into()
}

async fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    let Some(reader) = reader else {
        return String::new();
    };
    let bytes = reader.await.unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Stage;
    use crate::sizes::SizeClass;
    use std::path::PathBuf;

    fn sh_job(script: &str) -> Job {
        Job {
            stage: Stage::Generate,
            size_class: SizeClass::new(3072),
            program: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script.to_string()],
            input: None,
            output: PathBuf::from("/dev/null"),
        }
    }

    #[tokio::test]
    async fn test_drain_keeps_trailing_bytes() {
        assert_eq!(drain(&b"abcdef"[..], 3).await, b"def");
        assert_eq!(drain(&b"abc"[..], 10).await, b"abc");
        assert!(drain(&b""[..], 10).await.is_empty());
        assert!(drain(&b"abc"[..], 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_drain_bounds_long_output() {
        let mut input = vec![b'x'; 100_000];
        input.extend_from_slice(b"0123456789");

        let kept = drain(&input[..], 10).await;
        assert_eq!(kept, b"0123456789");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_caps_captured_output() {
        let launcher = ProcessLauncher::new(LauncherConfig {
            capture_bytes: 16,
            ..LauncherConfig::default()
        });
        let handle = launcher
            .launch(&sh_job("head -c 200000 /dev/zero | tr '\\0' a; printf tail-of-output"))
            .await
            .unwrap();

        let exit = handle.wait().await.unwrap();
        assert!(exit.is_success());
        assert_eq!(exit.stdout, "aatail-of-output");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_success_captures_output() {
        let launcher = ProcessLauncher::with_defaults();
        let handle = launcher
            .launch(&sh_job("echo out; echo err >&2"))
            .await
            .unwrap();
        assert!(handle.pid().is_some());

        let exit = handle.wait().await.unwrap();
        assert!(exit.is_success());
        assert_eq!(exit.stdout.trim(), "out");
        assert_eq!(exit.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_non_zero_exit() {
        let launcher = ProcessLauncher::with_defaults();
        let handle = launcher
            .launch(&sh_job("echo broken >&2; exit 3"))
            .await
            .unwrap();

        let exit = handle.wait().await.unwrap();
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.check(), Err(JobError::NonZeroExit { code: 3 }));
        assert!(exit.stderr.contains("broken"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_timeout_kills_process() {
        let launcher = ProcessLauncher::new(
            LauncherConfig::default().with_timeout(Duration::from_millis(100)),
        );
        let handle = launcher.launch(&sh_job("sleep 30")).await.unwrap();

        let err = handle.wait().await.unwrap_err();
        assert_eq!(err, JobError::TimedOut { timeout_ms: 100 });
    }

    #[tokio::test]
    async fn test_launch_missing_program() {
        let launcher = ProcessLauncher::with_defaults();
        let mut job = sh_job("true");
        job.program = PathBuf::from("/nonexistent/modforge-tool");

        let err = launcher.launch(&job).await.unwrap_err();
        assert!(matches!(err, JobError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_returns_before_exit() {
        let launcher = ProcessLauncher::with_defaults();
        let start = Instant::now();
        let handle = launcher.launch(&sh_job("sleep 1")).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(900));

        let exit = handle.wait().await.unwrap();
        assert!(exit.is_success());
    }
}
