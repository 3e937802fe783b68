//! Plain-text rendering of a [`RunReport`].

use std::fmt::Write as _;

use fslreset_core::report::{format_bytes, Step, StepOutcome};
use fslreset_core::RunReport;

const STEPS: [Step; 5] = [
    Step::IdentityResolution,
    Step::ServiceQuiesce,
    Step::LocalCache,
    Step::RemoteContainers,
    Step::ServiceRestart,
];

/// Operator-facing summary printed at the end of a run.
pub fn render_summary(report: &RunReport) -> String {
    let mut out = String::new();

    let name = report
        .identity
        .name
        .as_ref()
        .map(|n| n.as_str())
        .unwrap_or("<unknown>");
    let _ = writeln!(out, "Profile reset for {name} ({})", report.identity.sid);
    if report.dry_run {
        let _ = writeln!(out, "DRY RUN: nothing was changed");
    }

    for step in STEPS {
        for entry in report.outcomes(step) {
            let target = entry
                .target
                .as_deref()
                .map(|t| format!(" {t}"))
                .unwrap_or_default();
            let (tag, text) = match &entry.outcome {
                StepOutcome::Succeeded { detail } => ("ok", detail),
                StepOutcome::Planned { detail } => ("plan", detail),
                StepOutcome::Skipped { reason } => ("skip", reason),
                StepOutcome::Failed { reason } => ("FAIL", reason),
            };
            let _ = writeln!(out, "  [{tag:>4}] {}{target}: {text}", step.label());
        }
    }

    if !report.matched_files.is_empty() {
        let _ = writeln!(out, "Matched remote containers:");
        for file in &report.matched_files {
            let size = file.size_bytes.map(format_bytes).unwrap_or_else(|| "?".into());
            let _ = writeln!(
                out,
                "  {} ({}, {size})",
                file.path.display(),
                file.category.label()
            );
        }
    }

    if report.bytes_reclaimed > 0 {
        let _ = writeln!(out, "Reclaimed {}", format_bytes(report.bytes_reclaimed));
    }

    match report.warning_count() {
        0 => {}
        1 => {
            let _ = writeln!(out, "1 step failed; see the log above");
        }
        n => {
            let _ = writeln!(out, "{n} steps failed; see the log above");
        }
    }

    if !report.dry_run {
        let _ = writeln!(
            out,
            "Have the user log on again to create a fresh profile."
        );
    }

    out
}
