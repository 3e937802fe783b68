//! External command execution with a timeout.
//!
//! Service control and identity translation shell out to system tools
//! (`sc.exe`, `powershell.exe`, `systemctl`, `id`). [`CommandRunner`]
//! runs them on a private current-thread runtime so each call can be
//! bounded with `tokio::time::timeout` while the caller stays synchronous.

use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};

use fslreset_core::FacilityError;

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty.
    /// Windows tools often report errors on stdout.
    pub fn message(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

pub struct CommandRunner {
    runtime: Runtime,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime, timeout })
    }

    pub fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput, FacilityError> {
        self.run_with_env(program, args, &[])
    }

    /// Run `program` with extra environment variables.
    ///
    /// Values that come from user input are passed through the
    /// environment rather than the command line.
    pub fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<CommandOutput, FacilityError> {
        let start = Instant::now();

        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }

        tracing::debug!(program, ?args, "Running command");

        let result = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, cmd.output()).await });

        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(output)) => {
                let output = CommandOutput {
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    duration_ms,
                };
                tracing::debug!(program, code = ?output.code, duration_ms, "Command finished");
                Ok(output)
            }
            Ok(Err(e)) => Err(FacilityError::failed("spawn", program, e)),
            // `cmd.output()` is dropped here, which kills the child.
            Err(_) => Err(FacilityError::Timeout {
                operation: program.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
