use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::candidates::candidates;
use crate::config::{ContainerCategory, ResetConfig};
use crate::error::FacilityError;
use crate::facilities::{ConfigSource, FileSystem};
use crate::identity::ResolvedIdentity;
use crate::report::{format_bytes, ActionKind, MatchedFile, RunReport, Step, StepOutcome};

use super::mutate;

/// Find and delete the user's container files on every configured share.
pub(crate) fn remove_remote_containers(
    source: &dyn ConfigSource,
    fs: &dyn FileSystem,
    config: &ResetConfig,
    identity: &ResolvedIdentity,
    dry_run: bool,
    report: &mut RunReport,
) {
    // Shared across categories so a share listed under both is handled once.
    let mut seen = BTreeSet::new();

    for category in ContainerCategory::ALL {
        let key = config.config_key(category);

        let configured = match config.location_override(category) {
            Some(locations) => Ok(locations.to_vec()),
            None => source.read_multi(key, &config.locations_value),
        };
        let locations = match configured {
            Ok(raw) => normalize_locations(raw),
            Err(e) => {
                tracing::warn!(category = category.label(), key, error = %e, "Could not read configured locations");
                report.record(
                    Step::RemoteContainers,
                    Some(key.to_string()),
                    StepOutcome::Failed {
                        reason: e.to_string(),
                    },
                );
                continue;
            }
        };

        if locations.is_empty() {
            tracing::info!(category = category.label(), key, "No locations configured");
            report.record(
                Step::RemoteContainers,
                Some(key.to_string()),
                StepOutcome::Skipped {
                    reason: format!("no {} locations configured", category.label()),
                },
            );
            continue;
        }

        tracing::info!(category = category.label(), locations = ?locations, "Configured locations");

        let matched: Vec<PathBuf> = find_matches(fs, &locations, identity, report)
            .into_iter()
            .filter(|path| seen.insert(path.clone()))
            .collect();

        if matched.is_empty() {
            tracing::info!(category = category.label(), "No matching container files");
            report.record(
                Step::RemoteContainers,
                Some(key.to_string()),
                StepOutcome::Skipped {
                    reason: format!("no {} containers found", category.label()),
                },
            );
            continue;
        }

        // The full set is reported before anything is deleted.
        let files: Vec<MatchedFile> = matched
            .iter()
            .map(|path| MatchedFile {
                category,
                path: path.clone(),
                size_bytes: fs.file_size(path),
            })
            .collect();
        for file in &files {
            tracing::info!(
                category = category.label(),
                path = %file.path.display(),
                size = %file.size_bytes.map_or_else(|| "unknown size".to_string(), format_bytes),
                "Matched container file",
            );
        }
        report.matched_files.extend(files.iter().cloned());

        for file in files {
            delete_file(fs, &file, dry_run, report);
        }
    }

    if report.bytes_reclaimed > 0 {
        tracing::info!(reclaimed = %format_bytes(report.bytes_reclaimed), "Remote containers removed");
    }
}

/// Trim entries, drop blanks and duplicates, keep configured order.
fn normalize_locations(raw: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    raw.into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

/// Resolve every candidate pattern for every location; dedupe by path.
fn find_matches(
    fs: &dyn FileSystem,
    locations: &[String],
    identity: &ResolvedIdentity,
    report: &mut RunReport,
) -> BTreeSet<PathBuf> {
    let mut matched = BTreeSet::new();

    for location in locations {
        for pattern in candidates(location, identity) {
            match fs.glob(&pattern) {
                Ok(paths) => matched.extend(paths),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Could not resolve pattern");
                    report.record(
                        Step::RemoteContainers,
                        Some(pattern),
                        StepOutcome::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
        }
    }

    matched
}

fn delete_file(fs: &dyn FileSystem, file: &MatchedFile, dry_run: bool, report: &mut RunReport) {
    let path = file.path.as_path();
    let target = Some(path.display().to_string());

    let outcome = match remove_file(fs, path, dry_run, report) {
        Ok(()) if dry_run => StepOutcome::Planned {
            detail: "would remove container file".into(),
        },
        Ok(()) => {
            tracing::info!(path = %path.display(), "Removed container file");
            report.bytes_reclaimed += file.size_bytes.unwrap_or(0);
            StepOutcome::Succeeded {
                detail: "removed container file".into(),
            }
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove container file");
            StepOutcome::Failed {
                reason: e.to_string(),
            }
        }
    };
    report.record(Step::RemoteContainers, target, outcome);
}

fn remove_file(
    fs: &dyn FileSystem,
    path: &Path,
    dry_run: bool,
    report: &mut RunReport,
) -> Result<(), FacilityError> {
    mutate(report, ActionKind::ClearAttributes, path, dry_run, || {
        fs.clear_attributes(path, false)
    })?;
    mutate(report, ActionKind::RemoveFile, path, dry_run, || {
        fs.remove(path, false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_dedupes_in_order() {
        let raw = vec![
            " \\\\fs01\\profiles ".to_string(),
            String::new(),
            "\\\\fs02\\profiles".to_string(),
            "\\\\fs01\\profiles".to_string(),
        ];
        assert_eq!(
            normalize_locations(raw),
            vec!["\\\\fs01\\profiles".to_string(), "\\\\fs02\\profiles".to_string()]
        );
    }
}
