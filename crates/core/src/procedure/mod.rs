//! The profile reset procedure.
//!
//! A linear, best-effort sequence:
//!
//! 1. privilege check and identity resolution (fatal on failure);
//! 2. stop the agent service, waiting a bounded time for it to stop;
//! 3. delete the per-SID local cache directories;
//! 4. when authorised, delete matching remote container files;
//! 5. restart the agent service.
//!
//! Steps 2–5 never abort the run. Each unit of work records its outcome
//! in the [`RunReport`] and execution moves on. The restart in step 5 is
//! tied to a [`ServiceGuard`] so it also runs if an earlier step panics.

mod local;
mod remote;
mod service;

use std::path::Path;

use crate::config::ResetConfig;
use crate::error::{FacilityError, ResetError};
use crate::facilities::{Facilities, IdentityTranslator, Privileges};
use crate::identity::{Identity, ResolvedIdentity};
use crate::report::{ActionKind, RunReport, Step, StepOutcome};

pub use service::{wait_for_stopped, ServiceGuard};

/// What the operator asked for.
#[derive(Debug, Clone)]
pub struct ResetRequest {
    pub identity: Identity,
    /// Authorises deletion of remote container files.
    pub delete_remote: bool,
    /// Describe every destructive action instead of performing it.
    pub dry_run: bool,
}

/// Run a full reset.
///
/// Returns `Err` only for fatal conditions detected before any mutation.
/// Everything after identity resolution is best-effort and reported
/// through the returned [`RunReport`].
pub fn run_reset(
    request: &ResetRequest,
    config: &ResetConfig,
    facilities: &Facilities<'_>,
) -> Result<RunReport, ResetError> {
    ensure_elevated(facilities.privileges)?;
    config.validate()?;

    let identity = resolve_identity(&request.identity, facilities.identities)?;

    tracing::info!(
        sid = %identity.sid,
        name = identity.name.as_ref().map(|n| n.as_str()).unwrap_or("<unknown>"),
        dry_run = request.dry_run,
        delete_remote = request.delete_remote,
        "Resetting profile containers",
    );

    let mut report = RunReport::new(identity.clone(), request.dry_run, request.delete_remote);
    report.record(
        Step::IdentityResolution,
        Some(identity.sid.to_string()),
        StepOutcome::Succeeded {
            detail: match &identity.name {
                Some(name) => format!("resolved to {name}"),
                None => "display name unavailable".to_string(),
            },
        },
    );

    let guard = service::quiesce(facilities.services, config, request.dry_run, &mut report);

    local::remove_local_cache(facilities.fs, config, &identity.sid, request.dry_run, &mut report);

    if request.delete_remote {
        remote::remove_remote_containers(
            facilities.config_source,
            facilities.fs,
            config,
            &identity,
            request.dry_run,
            &mut report,
        );
    } else {
        tracing::info!("Remote container deletion not requested, skipping");
        report.record(
            Step::RemoteContainers,
            None,
            StepOutcome::Skipped {
                reason: "remote deletion not requested".into(),
            },
        );
    }

    guard.release(&mut report);
    report.finish();

    tracing::info!(
        sid = %identity.sid,
        warnings = report.warning_count(),
        "Reset complete. Have the user log on to create a fresh profile",
    );

    Ok(report)
}

fn ensure_elevated(privileges: &dyn Privileges) -> Result<(), ResetError> {
    match privileges.is_elevated() {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::error!("Administrative privilege is required, aborting");
            Err(ResetError::NotElevated)
        }
        Err(e) => Err(ResetError::PrivilegeCheck(e)),
    }
}

/// Normalise the supplied identity to a SID and best-effort display name.
///
/// A name that cannot be translated is fatal. A SID that cannot be
/// reverse-translated is not: the supplied name (if any) is kept, or the
/// name is left absent.
pub fn resolve_identity(
    identity: &Identity,
    translator: &dyn IdentityTranslator,
) -> Result<ResolvedIdentity, ResetError> {
    let (sid, supplied_name) = match identity {
        Identity::Sid(sid) => (sid.clone(), None),
        Identity::Name(name) => {
            let sid = translator
                .name_to_sid(name)
                .map_err(|source| ResetError::IdentityResolution {
                    name: name.to_string(),
                    source,
                })?;
            tracing::debug!(name = %name, sid = %sid, "Translated login name");
            (sid, Some(name.clone()))
        }
    };

    let name = match translator.sid_to_name(&sid) {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::warn!(sid = %sid, error = %e, "Could not resolve a login name for SID");
            supplied_name
        }
    };

    Ok(ResolvedIdentity { sid, name })
}

/// Run a destructive operation, or only record it when `dry_run` is set.
///
/// Performed actions are recorded only once they succeed.
fn mutate<F>(
    report: &mut RunReport,
    kind: ActionKind,
    target: &Path,
    dry_run: bool,
    op: F,
) -> Result<(), FacilityError>
where
    F: FnOnce() -> Result<(), FacilityError>,
{
    if dry_run {
        tracing::info!(action = ?kind, target = %target.display(), "Dry run: not performed");
        report.push_action(kind, target, false);
        return Ok(());
    }

    op()?;
    report.push_action(kind, target, true);
    Ok(())
}
