//! Agent service quiesce and guaranteed restart.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ResetConfig;
use crate::error::FacilityError;
use crate::facilities::{ServiceControl, ServiceState};
use crate::report::{ActionKind, RunReport, Step, StepOutcome};

/// Restarts the agent service when released or dropped.
///
/// Returned by the quiesce step. [`ServiceGuard::release`] restarts on
/// the normal path and records the outcome; `Drop` covers every other
/// exit path, including unwinding from a panic.
pub struct ServiceGuard<'a> {
    services: &'a dyn ServiceControl,
    name: String,
    dry_run: bool,
    /// `false` once restarted, or when there is nothing to restart.
    armed: bool,
}

impl<'a> ServiceGuard<'a> {
    fn new(services: &'a dyn ServiceControl, name: &str, dry_run: bool, armed: bool) -> Self {
        Self {
            services,
            name: name.to_string(),
            dry_run,
            armed,
        }
    }

    /// Restart the service and record the outcome.
    pub fn release(mut self, report: &mut RunReport) {
        let target = Some(self.name.clone());

        if !self.armed {
            report.record(
                Step::ServiceRestart,
                target,
                StepOutcome::Skipped {
                    reason: "service is not installed".into(),
                },
            );
            return;
        }
        self.armed = false;

        if self.dry_run {
            tracing::info!(service = %self.name, "Dry run: would start service");
            report.push_action(ActionKind::StartService, Path::new(&self.name), false);
            report.record(
                Step::ServiceRestart,
                target,
                StepOutcome::Planned {
                    detail: format!("would start {}", self.name),
                },
            );
            return;
        }

        match self.start() {
            Ok(()) => {
                report.push_action(ActionKind::StartService, Path::new(&self.name), true);
                report.record(
                    Step::ServiceRestart,
                    target,
                    StepOutcome::Succeeded {
                        detail: format!("started {}", self.name),
                    },
                );
            }
            Err(e) => report.record(
                Step::ServiceRestart,
                target,
                StepOutcome::Failed {
                    reason: e.to_string(),
                },
            ),
        }
    }

    fn start(&self) -> Result<(), FacilityError> {
        tracing::info!(service = %self.name, "Starting service");
        self.services.start(&self.name).inspect_err(|e| {
            tracing::warn!(service = %self.name, error = %e, "Failed to start service");
        })
    }
}

impl Drop for ServiceGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        if self.dry_run {
            tracing::info!(service = %self.name, "Dry run: would start service");
            return;
        }

        tracing::warn!(service = %self.name, "Reset interrupted, restarting service");
        let _ = self.start();
    }
}

/// Stop the agent service if it is running and wait for it to stop.
///
/// Never fails the run: problems are recorded and the guard is returned
/// regardless so that the restart is still attempted.
pub(crate) fn quiesce<'a>(
    services: &'a dyn ServiceControl,
    config: &ResetConfig,
    dry_run: bool,
    report: &mut RunReport,
) -> ServiceGuard<'a> {
    let name = config.service_name.as_str();
    let target = Some(name.to_string());

    let state = match services.status(name) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(service = %name, error = %e, "Could not query service status");
            report.record(
                Step::ServiceQuiesce,
                target,
                StepOutcome::Failed {
                    reason: e.to_string(),
                },
            );
            return ServiceGuard::new(services, name, dry_run, true);
        }
    };

    match state {
        ServiceState::NotInstalled => {
            tracing::info!(service = %name, "Service not installed, nothing to stop");
            report.record(
                Step::ServiceQuiesce,
                target,
                StepOutcome::Skipped {
                    reason: "service is not installed".into(),
                },
            );
            ServiceGuard::new(services, name, dry_run, false)
        }
        ServiceState::Stopped => {
            tracing::info!(service = %name, "Service already stopped");
            report.record(
                Step::ServiceQuiesce,
                target,
                StepOutcome::Skipped {
                    reason: "service already stopped".into(),
                },
            );
            ServiceGuard::new(services, name, dry_run, true)
        }
        ServiceState::Running | ServiceState::Pending => {
            let outcome = stop_and_wait(services, config, dry_run, report);
            report.record(Step::ServiceQuiesce, target, outcome);
            ServiceGuard::new(services, name, dry_run, true)
        }
    }
}

fn stop_and_wait(
    services: &dyn ServiceControl,
    config: &ResetConfig,
    dry_run: bool,
    report: &mut RunReport,
) -> StepOutcome {
    let name = config.service_name.as_str();

    if dry_run {
        tracing::info!(service = %name, "Dry run: would stop service");
        report.push_action(ActionKind::StopService, Path::new(name), false);
        return StepOutcome::Planned {
            detail: format!("would stop {name}"),
        };
    }

    tracing::info!(service = %name, "Stopping service");
    if let Err(e) = services.stop(name) {
        tracing::warn!(service = %name, error = %e, "Failed to stop service");
        return StepOutcome::Failed {
            reason: e.to_string(),
        };
    }
    report.push_action(ActionKind::StopService, Path::new(name), true);

    match wait_for_stopped(services, name, config.stop_timeout, config.poll_interval) {
        Ok(elapsed) => {
            tracing::info!(service = %name, elapsed_ms = elapsed.as_millis() as u64, "Service stopped");
            StepOutcome::Succeeded {
                detail: format!("stopped {name}"),
            }
        }
        Err(e) => {
            tracing::warn!(service = %name, error = %e, "Service did not stop in time, continuing");
            StepOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

/// Poll `status` until the service is stopped (or gone) or `timeout` elapses.
///
/// Returns the time waited. Status query errors end the wait early.
pub fn wait_for_stopped(
    services: &dyn ServiceControl,
    name: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Duration, FacilityError> {
    let start = Instant::now();

    loop {
        match services.status(name)? {
            ServiceState::Stopped | ServiceState::NotInstalled => return Ok(start.elapsed()),
            ServiceState::Running | ServiceState::Pending => {}
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(FacilityError::Timeout {
                operation: format!("waiting for {name} to stop"),
                secs: timeout.as_secs(),
            });
        }

        thread::sleep(poll_interval.min(timeout - elapsed));
    }
}
