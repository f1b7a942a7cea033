//! Command execution abstraction with bounded timeouts.
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};

/// Result of a command execution.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Raw exit code, if the process exited normally.
    pub code: Option<i32>,
}

/// Abstraction over external command execution.
///
/// Production code uses [`SystemExecutor`]; tests substitute queue-based
/// mocks or a stateful simulated host so that provider logic can be
/// exercised without touching the real system.
pub trait Executor: Send + Sync {
    /// Run a command and return its output. Fails if the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be spawned, exceeds the
    /// executor's timeout, or exits with a non-zero status.
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Run a command, allowing failure (returns the result without bailing).
    ///
    /// # Errors
    ///
    /// Returns an error only if the command cannot be spawned or exceeds
    /// the executor's timeout; a non-zero exit is reported via
    /// [`ExecResult::success`].
    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult>;

    /// Check if a program is available on PATH.
    fn which(&self, program: &str) -> bool;
}

/// Production [`Executor`] that spawns real processes.
///
/// Every call is bounded by a per-invocation timeout: registry, service
/// and package-manager tools can hang indefinitely, and a stuck call must
/// surface as a failed outcome rather than wedging the whole run.
#[derive(Debug, Clone)]
pub struct SystemExecutor {
    timeout: Duration,
}

impl Default for SystemExecutor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl SystemExecutor {
    /// Default per-command timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create an executor with the given per-command timeout.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Spawn `program`, capture its output, and enforce the timeout.
    fn execute(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute: {program}"))?;

        let stdout = drain_pipe(child.stdout.take());
        let stderr = drain_pipe(child.stderr.take());

        let status = self.wait_with_timeout(&mut child, program)?;

        Ok(ExecResult {
            stdout: String::from_utf8_lossy(&stdout.join().unwrap_or_default()).to_string(),
            stderr: String::from_utf8_lossy(&stderr.join().unwrap_or_default()).to_string(),
            success: status.success(),
            code: status.code(),
        })
    }

    /// Poll the child until it exits or the deadline passes, killing it on
    /// expiry.
    fn wait_with_timeout(
        &self,
        child: &mut Child,
        program: &str,
    ) -> Result<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("failed to wait for: {program}"))?
            {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                child.kill().ok();
                child.wait().ok();
                bail!("{program} timed out after {}s", self.timeout.as_secs());
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

/// Read a child pipe to completion on a background thread.
///
/// Reading concurrently with the wait loop avoids the deadlock where a
/// child blocks on a full pipe that nobody is draining.
fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf).ok();
        }
        buf
    })
}

impl Executor for SystemExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        let result = self.execute(program, args)?;
        if !result.success {
            bail!(
                "{program} failed (exit {}): {}",
                result.code.unwrap_or(-1),
                result.stderr.trim()
            );
        }
        Ok(result)
    }

    fn run_unchecked(&self, program: &str, args: &[&str]) -> Result<ExecResult> {
        self.execute(program, args)
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
