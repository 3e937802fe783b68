//! Run report: per-step outcomes, performed or planned actions, and
//! the remote files matched during a reset.
//!
//! The report is built up as the procedure runs and is returned to the
//! caller for rendering (plain text or JSON).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ContainerCategory;
use crate::identity::ResolvedIdentity;

/// The ordered steps of a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    IdentityResolution,
    ServiceQuiesce,
    LocalCache,
    RemoteContainers,
    ServiceRestart,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::IdentityResolution => "identity resolution",
            Step::ServiceQuiesce => "service stop",
            Step::LocalCache => "local cache",
            Step::RemoteContainers => "remote containers",
            Step::ServiceRestart => "service restart",
        }
    }
}

/// Outcome of one unit of work within a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded { detail: String },
    /// Dry run: the work was described but not performed.
    Planned { detail: String },
    Skipped { reason: String },
    Failed { reason: String },
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub step: Step,
    /// Path, service or configuration root the outcome refers to.
    pub target: Option<String>,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    StopService,
    StartService,
    ClearAttributes,
    RemoveDirectory,
    RemoveFile,
}

/// A destructive action, either performed or (in a dry run) only planned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub kind: ActionKind,
    pub target: String,
    pub performed: bool,
}

/// A remote container file that matched the naming heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedFile {
    pub category: ContainerCategory,
    pub path: PathBuf,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub identity: ResolvedIdentity,
    pub dry_run: bool,
    pub remote_authorized: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepReport>,
    pub actions: Vec<Action>,
    pub matched_files: Vec<MatchedFile>,
    /// Bytes of remote container files actually deleted.
    pub bytes_reclaimed: u64,
}

impl RunReport {
    pub fn new(identity: ResolvedIdentity, dry_run: bool, remote_authorized: bool) -> Self {
        Self {
            identity,
            dry_run,
            remote_authorized,
            started_at: Utc::now(),
            finished_at: None,
            steps: Vec::new(),
            actions: Vec::new(),
            matched_files: Vec::new(),
            bytes_reclaimed: 0,
        }
    }

    pub fn record(&mut self, step: Step, target: Option<String>, outcome: StepOutcome) {
        self.steps.push(StepReport {
            step,
            target,
            outcome,
        });
    }

    pub fn push_action(&mut self, kind: ActionKind, target: &Path, performed: bool) {
        self.actions.push(Action {
            kind,
            target: target.display().to_string(),
            performed,
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Outcomes recorded for `step`, in order.
    pub fn outcomes(&self, step: Step) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(move |s| s.step == step)
    }

    /// Number of recoverable failures recorded during the run.
    pub fn warning_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_failure()).count()
    }

    /// Whether any destructive action was actually carried out.
    pub fn mutated(&self) -> bool {
        self.actions.iter().any(|a| a.performed)
    }
}

/// Human-readable byte formatting.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    let b = bytes as f64;
    if b >= TB {
        format!("{:.2} TB", b / TB)
    } else if b >= GB {
        format!("{:.2} GB", b / GB)
    } else if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.2} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}
