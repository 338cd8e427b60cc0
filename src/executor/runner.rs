// Main Executor implementation

use crate::executor::capture::{Captured, read_capped};
use crate::executor::config::ExecutorConfig;
use crate::executor::sandbox::{SpawnLimits, build_command};
use crate::executor::terminate::{signal_group, terminate_group};
use crate::executor::types::{ExecutionResult, ResourcePolicy};
use std::future::Future;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// How the wait for the child ended
enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// SIGKILLs the child's process group if the run is abandoned before reaping
///
/// `kill_on_drop` only reaches the group leader.
struct GroupGuard {
    pgid: u32,
    armed: bool,
}

impl GroupGuard {
    fn new(pgid: u32) -> Self {
        Self { pgid, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.armed {
            warn!(pid = self.pgid, "execution dropped before completion, killing process group");
            let _ = signal_group(self.pgid, libc::SIGKILL);
        }
    }
}

/// Sandboxed executor for external programs
///
/// Each call owns exactly one child process for its whole lifetime.
#[derive(Debug, Clone)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        debug!(
            default_timeout_ms = config.default_timeout_ms,
            max_output_bytes = config.max_output_bytes,
            restricted = config.restricted,
            "initializing executor"
        );
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run `program` with `args` under `policy` and wait for it
    pub async fn execute(&self, program: &str, args: &[String], policy: &ResourcePolicy) -> ExecutionResult {
        self.execute_cancellable(program, args, policy, std::future::pending::<()>(), |_| {})
            .await
    }

    /// Like `execute`, but `cancel` resolving terminates the child
    ///
    /// `on_spawn` receives the child's pid once it is running. Timeout and
    /// cancellation go through the same termination path.
    pub async fn execute_cancellable<C, S>(
        &self,
        program: &str,
        args: &[String],
        policy: &ResourcePolicy,
        cancel: C,
        on_spawn: S,
    ) -> ExecutionResult
    where
        C: Future<Output = ()>,
        S: FnOnce(u32),
    {
        let start = Instant::now();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        // Restricted runs without a directory get a private scratch one,
        // removed when `_scratch` drops at the end of this call
        let (working_dir, _scratch) = match self.prepare_working_dir(policy).await {
            Ok(pair) => pair,
            Err(message) => {
                warn!(program = %program, error = %message, "working directory rejected");
                return ExecutionResult::not_started(message, elapsed(start));
            }
        };

        let limits = SpawnLimits::new(policy, &self.config);
        let mut cmd = build_command(program, args, policy, &working_dir, limits);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program = %program, error = %e, "failed to spawn process");
                return ExecutionResult::not_started(
                    format!("failed to spawn '{}': {}", program, e),
                    elapsed(start),
                );
            }
        };

        let Some(pid) = child.id() else {
            return ExecutionResult::not_started(
                format!("process '{}' exited before its pid was read", program),
                elapsed(start),
            );
        };
        let mut guard = GroupGuard::new(pid);
        on_spawn(pid);

        info!(
            program = %program,
            arg_count = args.len(),
            pid = pid,
            timeout_ms = policy.timeout_millis,
            memory_limit_mb = policy.memory_limit_mb,
            niceness = policy.niceness,
            restricted = policy.restricted,
            "process spawned"
        );

        let cap = self.config.max_output_bytes;
        let stdout_task = child.stdout.take().map(|s| tokio::spawn(read_capped(s, cap)));
        let stderr_task = child.stderr.take().map(|s| tokio::spawn(read_capped(s, cap)));

        let outcome = tokio::select! {
            biased;
            status = child.wait() => Outcome::Exited(status),
            _ = sleep(Duration::from_millis(policy.timeout_millis)) => Outcome::TimedOut,
            _ = cancel => Outcome::Cancelled,
        };

        let grace = Duration::from_millis(self.config.kill_grace_ms);
        let (status, timed_out, cancelled) = match outcome {
            Outcome::Exited(status) => {
                // Sweep anything the child left behind in its group
                let _ = signal_group(pid, libc::SIGKILL);
                (status, false, false)
            }
            Outcome::TimedOut => {
                info!(pid = pid, timeout_ms = policy.timeout_millis, "process timed out, terminating");
                (terminate_group(&mut child, pid, grace).await, true, false)
            }
            Outcome::Cancelled => {
                info!(pid = pid, "process cancelled, terminating");
                (terminate_group(&mut child, pid, grace).await, false, true)
            }
        };

        let stdout = collect(stdout_task, pid, grace).await;
        let stderr = collect(stderr_task, pid, grace).await;
        guard.disarm();
        let truncated = stdout.is_truncated() || stderr.is_truncated();

        let (exit_code, wait_error) = match &status {
            Ok(status) => (status.code().unwrap_or(-1), None),
            Err(e) => (-1, Some(format!("failed to wait for process: {}", e))),
        };

        let error = if timed_out {
            Some(format!("timed out after {}ms", policy.timeout_millis))
        } else if cancelled {
            Some("cancelled".to_string())
        } else if let Some(e) = wait_error {
            Some(e)
        } else if let Ok(Some(signal)) = status.as_ref().map(|s| s.signal()) {
            Some(format!("terminated by signal {}", signal))
        } else {
            None
        };

        let success = exit_code == 0 && !timed_out && !cancelled && status.is_ok();
        let elapsed_millis = elapsed(start);

        info!(
            program = %program,
            pid = pid,
            exit_code = exit_code,
            elapsed_ms = elapsed_millis,
            timed_out = timed_out,
            cancelled = cancelled,
            truncated = truncated,
            success = success,
            "process finished"
        );

        ExecutionResult {
            success,
            exit_code,
            stdout: stdout.into_text(),
            stderr: stderr.into_text(),
            elapsed_millis,
            error,
            timed_out,
            cancelled,
            truncated,
            pid: Some(pid),
        }
    }

    async fn prepare_working_dir(
        &self,
        policy: &ResourcePolicy,
    ) -> std::result::Result<(PathBuf, Option<tempfile::TempDir>), String> {
        match &policy.working_directory {
            Some(dir) => {
                match tokio::fs::metadata(dir).await {
                    Ok(meta) if meta.is_dir() => {}
                    Ok(_) => return Err(format!("working directory '{}' is not a directory", dir.display())),
                    Err(e) => {
                        return Err(format!("working directory '{}' is not usable: {}", dir.display(), e));
                    }
                }
                match (&self.config.working_root, policy.restricted) {
                    (Some(root), true) => within_root(dir, root).await.map(|dir| (dir, None)),
                    _ => Ok((dir.clone(), None)),
                }
            }
            None if policy.restricted => {
                let scratch = tempfile::Builder::new()
                    .prefix("simgate-")
                    .tempdir()
                    .map_err(|e| format!("failed to create scratch directory: {}", e))?;
                Ok((scratch.path().to_path_buf(), Some(scratch)))
            }
            None => std::env::current_dir()
                .map(|dir| (dir, None))
                .map_err(|e| format!("failed to resolve working directory: {}", e)),
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

/// Resolve `dir` and require it to sit under `root`; symlinks are followed first
async fn within_root(dir: &Path, root: &Path) -> std::result::Result<PathBuf, String> {
    let resolved = tokio::fs::canonicalize(dir)
        .await
        .map_err(|e| format!("working directory '{}' is not usable: {}", dir.display(), e))?;
    let root = tokio::fs::canonicalize(root)
        .await
        .map_err(|e| format!("working root '{}' is not usable: {}", root.display(), e))?;
    if resolved.starts_with(&root) {
        Ok(resolved)
    } else {
        Err(format!(
            "working directory '{}' is outside the permitted root",
            dir.display()
        ))
    }
}

/// Join a capture task; a pipe still held open by an escaped descendant is
/// cut off after `grace`
async fn collect(
    task: Option<JoinHandle<std::io::Result<Captured>>>,
    pid: u32,
    grace: Duration,
) -> Captured {
    let Some(mut task) = task else {
        return Captured::default();
    };
    match timeout(grace, &mut task).await {
        Ok(Ok(Ok(captured))) => captured,
        Ok(Ok(Err(e))) => {
            warn!(pid = pid, error = %e, "failed to read process output");
            Captured::default()
        }
        Ok(Err(e)) => {
            warn!(pid = pid, error = %e, "output reader task failed");
            Captured::default()
        }
        Err(_) => {
            warn!(pid = pid, "output pipe still open after exit, abandoning capture");
            let _ = signal_group(pid, libc::SIGKILL);
            task.abort();
            Captured::default()
        }
    }
}
