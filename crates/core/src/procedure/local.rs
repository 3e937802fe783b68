use std::path::Path;

use crate::config::ResetConfig;
use crate::error::FacilityError;
use crate::facilities::FileSystem;
use crate::identity::Sid;
use crate::report::{ActionKind, RunReport, Step, StepOutcome};

use super::mutate;

/// Delete the per-SID cache directory of every configured category.
///
/// A failure in one category is recorded and the next category is tried.
pub(crate) fn remove_local_cache(
    fs: &dyn FileSystem,
    config: &ResetConfig,
    sid: &Sid,
    dry_run: bool,
    report: &mut RunReport,
) {
    for (category, dir) in config.cache_dirs(sid) {
        let target = Some(dir.display().to_string());

        let present = match fs.exists(&dir) {
            Ok(present) => present,
            Err(e) => {
                tracing::warn!(category = %category, path = %dir.display(), error = %e, "Could not inspect local cache");
                report.record(
                    Step::LocalCache,
                    target,
                    StepOutcome::Failed {
                        reason: e.to_string(),
                    },
                );
                continue;
            }
        };
        if !present {
            tracing::info!(category = %category, path = %dir.display(), "No local cache present");
            report.record(
                Step::LocalCache,
                target,
                StepOutcome::Skipped {
                    reason: "not present".into(),
                },
            );
            continue;
        }

        let outcome = match remove_tree(fs, &dir, dry_run, report) {
            Ok(()) if dry_run => StepOutcome::Planned {
                detail: format!("would remove {category} cache"),
            },
            Ok(()) => {
                tracing::info!(category = %category, path = %dir.display(), "Removed local cache");
                StepOutcome::Succeeded {
                    detail: format!("removed {category} cache"),
                }
            }
            Err(e) => {
                tracing::warn!(
                    category = %category,
                    path = %dir.display(),
                    error = %e,
                    "Failed to remove local cache",
                );
                StepOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        report.record(Step::LocalCache, target, outcome);
    }
}

fn remove_tree(
    fs: &dyn FileSystem,
    dir: &Path,
    dry_run: bool,
    report: &mut RunReport,
) -> Result<(), FacilityError> {
    mutate(report, ActionKind::ClearAttributes, dir, dry_run, || {
        fs.clear_attributes(dir, true)
    })?;
    mutate(report, ActionKind::RemoveDirectory, dir, dry_run, || {
        fs.remove(dir, true)
    })
}
