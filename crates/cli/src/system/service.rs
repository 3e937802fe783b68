//! Service control through the platform service manager.
//!
//! Windows uses `sc.exe`; everything else uses `systemctl`. Service names
//! are validated by the configuration layer before they get here.

use fslreset_core::facilities::{ServiceControl, ServiceState};
use fslreset_core::FacilityError;

use super::command::{CommandOutput, CommandRunner};

/// `sc.exe` exit code: the service is not installed.
const SC_SERVICE_DOES_NOT_EXIST: i32 = 1060;
/// `sc.exe` exit code: the service is already running.
const SC_ALREADY_RUNNING: i32 = 1056;
/// `sc.exe` exit code: the service has not been started.
const SC_NOT_ACTIVE: i32 = 1062;

pub struct SystemServices<'r> {
    runner: &'r CommandRunner,
}

impl<'r> SystemServices<'r> {
    pub fn new(runner: &'r CommandRunner) -> Self {
        Self { runner }
    }
}

impl ServiceControl for SystemServices<'_> {
    fn status(&self, name: &str) -> Result<ServiceState, FacilityError> {
        if cfg!(windows) {
            let output = self.runner.run("sc.exe", &["query", name])?;
            if output.code == Some(SC_SERVICE_DOES_NOT_EXIST) {
                return Ok(ServiceState::NotInstalled);
            }
            if !output.success() {
                return Err(command_failed("query service", name, &output));
            }
            parse_sc_state(&output.stdout)
                .ok_or_else(|| FacilityError::failed("query service", name, "no STATE in output"))
        } else {
            let output = self.runner.run(
                "systemctl",
                &["show", "--property=LoadState,ActiveState", name],
            )?;
            if !output.success() {
                return Err(command_failed("query service", name, &output));
            }
            parse_systemctl_state(&output.stdout).ok_or_else(|| {
                FacilityError::failed("query service", name, "no ActiveState in output")
            })
        }
    }

    fn stop(&self, name: &str) -> Result<(), FacilityError> {
        let output = if cfg!(windows) {
            self.runner.run("sc.exe", &["stop", name])?
        } else {
            // The caller polls for the stopped state with its own bound.
            self.runner.run("systemctl", &["stop", "--no-block", name])?
        };

        if output.success() || (cfg!(windows) && output.code == Some(SC_NOT_ACTIVE)) {
            tracing::debug!(service = %name, duration_ms = output.duration_ms, "Stop requested");
            Ok(())
        } else {
            Err(command_failed("stop service", name, &output))
        }
    }

    fn start(&self, name: &str) -> Result<(), FacilityError> {
        let output = if cfg!(windows) {
            self.runner.run("sc.exe", &["start", name])?
        } else {
            self.runner.run("systemctl", &["start", name])?
        };

        if output.success() || (cfg!(windows) && output.code == Some(SC_ALREADY_RUNNING)) {
            tracing::debug!(service = %name, duration_ms = output.duration_ms, "Service started");
            Ok(())
        } else {
            Err(command_failed("start service", name, &output))
        }
    }
}

fn command_failed(operation: &'static str, name: &str, output: &CommandOutput) -> FacilityError {
    FacilityError::failed(
        operation,
        name,
        format!("exit {}: {}", output.code.unwrap_or(-1), output.message()),
    )
}

/// Parse the `STATE` line of `sc.exe query` output.
///
/// ```text
/// SERVICE_NAME: frxsvc
///         TYPE               : 10  WIN32_OWN_PROCESS
///         STATE              : 4  RUNNING
/// ```
pub fn parse_sc_state(stdout: &str) -> Option<ServiceState> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("STATE"))?;
    let (_, value) = line.split_once(':')?;
    let code: u32 = value.split_whitespace().next()?.parse().ok()?;

    Some(match code {
        1 => ServiceState::Stopped,
        4 => ServiceState::Running,
        // A paused service still holds its handles.
        7 => ServiceState::Running,
        _ => ServiceState::Pending,
    })
}

/// Parse `systemctl show --property=LoadState,ActiveState` output.
pub fn parse_systemctl_state(stdout: &str) -> Option<ServiceState> {
    let mut load_state = None;
    let mut active_state = None;

    for line in stdout.lines() {
        match line.trim().split_once('=') {
            Some(("LoadState", v)) => load_state = Some(v.trim()),
            Some(("ActiveState", v)) => active_state = Some(v.trim()),
            _ => {}
        }
    }

    if load_state == Some("not-found") {
        return Some(ServiceState::NotInstalled);
    }

    Some(match active_state? {
        "active" | "reloading" => ServiceState::Running,
        "inactive" | "failed" => ServiceState::Stopped,
        _ => ServiceState::Pending,
    })
}
