//! Administrative privilege check.

use fslreset_core::facilities::Privileges;
use fslreset_core::FacilityError;

use super::command::CommandRunner;

pub struct SystemPrivileges<'r> {
    #[cfg_attr(not(windows), allow(dead_code))]
    runner: &'r CommandRunner,
}

impl<'r> SystemPrivileges<'r> {
    pub fn new(runner: &'r CommandRunner) -> Self {
        Self { runner }
    }
}

impl Privileges for SystemPrivileges<'_> {
    /// `net session` only succeeds from an elevated token.
    #[cfg(windows)]
    fn is_elevated(&self) -> Result<bool, FacilityError> {
        let output = self.runner.run("net", &["session"])?;
        Ok(output.success())
    }

    #[cfg(unix)]
    fn is_elevated(&self) -> Result<bool, FacilityError> {
        // SAFETY: geteuid has no preconditions and cannot fail.
        Ok(unsafe { libc::geteuid() } == 0)
    }

    #[cfg(not(any(windows, unix)))]
    fn is_elevated(&self) -> Result<bool, FacilityError> {
        Err(FacilityError::Unsupported("privilege check"))
    }
}
