//! Collaborator interfaces consumed by the reset procedure.
//!
//! Each trait is a narrow, synchronous view of an operating-system
//! facility. The CLI crate provides the real implementations; tests
//! substitute in-memory fakes.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::FacilityError;
use crate::identity::{LoginName, Sid};

/// Observed state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Running,
    Stopped,
    /// Starting, stopping, pausing or continuing.
    Pending,
    NotInstalled,
}

/// Whether the current process holds administrative privilege.
pub trait Privileges {
    fn is_elevated(&self) -> Result<bool, FacilityError>;
}

/// Service lifecycle control.
///
/// `stop` only requests the transition; the caller polls `status` for
/// confirmation.
pub trait ServiceControl {
    fn status(&self, name: &str) -> Result<ServiceState, FacilityError>;
    fn stop(&self, name: &str) -> Result<(), FacilityError>;
    fn start(&self, name: &str) -> Result<(), FacilityError>;
}

/// Multi-value configuration reads.
///
/// A missing root or value yields an empty list, not an error.
pub trait ConfigSource {
    fn read_multi(&self, root: &str, value: &str) -> Result<Vec<String>, FacilityError>;
}

/// Filesystem operations used by the procedure.
pub trait FileSystem {
    /// `Ok(false)` only when the path is known to be absent. Errors such
    /// as denied access are reported, not treated as absence.
    fn exists(&self, path: &Path) -> Result<bool, FacilityError>;

    /// Clear read-only and similar attributes that would block deletion.
    fn clear_attributes(&self, path: &Path, recursive: bool) -> Result<(), FacilityError>;

    fn remove(&self, path: &Path, recursive: bool) -> Result<(), FacilityError>;

    /// Existing files matching `pattern`, as absolute paths.
    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, FacilityError>;

    fn file_size(&self, path: &Path) -> Option<u64>;
}

/// Translation between login names and SIDs.
pub trait IdentityTranslator {
    fn name_to_sid(&self, name: &LoginName) -> Result<Sid, FacilityError>;
    fn sid_to_name(&self, sid: &Sid) -> Result<LoginName, FacilityError>;
}

/// The set of collaborators a reset run needs.
#[derive(Clone, Copy)]
pub struct Facilities<'a> {
    pub privileges: &'a dyn Privileges,
    pub services: &'a dyn ServiceControl,
    pub config_source: &'a dyn ConfigSource,
    pub fs: &'a dyn FileSystem,
    pub identities: &'a dyn IdentityTranslator,
}
