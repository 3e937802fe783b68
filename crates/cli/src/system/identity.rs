//! Login name / SID translation.
//!
//! On Windows this asks the local security authority through
//! PowerShell's `NTAccount` / `SecurityIdentifier` types. Elsewhere,
//! accounts map to the `S-1-22-1-<uid>` "Unix user" SIDs used by Samba.

use fslreset_core::facilities::IdentityTranslator;
use fslreset_core::{FacilityError, LoginName, Sid};

use super::command::CommandRunner;

/// Authority prefix of Samba's Unix user SIDs.
const UNIX_USER_SID_PREFIX: &str = "S-1-22-1-";

/// The account or SID travels in this variable, never on the command line.
const TARGET_VAR: &str = "FSLRESET_TARGET";

const NAME_TO_SID_SCRIPT: &str = "([System.Security.Principal.NTAccount]$env:FSLRESET_TARGET).Translate([System.Security.Principal.SecurityIdentifier]).Value";
const SID_TO_NAME_SCRIPT: &str = "([System.Security.Principal.SecurityIdentifier]$env:FSLRESET_TARGET).Translate([System.Security.Principal.NTAccount]).Value";

pub struct SystemIdentities<'r> {
    runner: &'r CommandRunner,
}

impl<'r> SystemIdentities<'r> {
    pub fn new(runner: &'r CommandRunner) -> Self {
        Self { runner }
    }

    fn powershell(&self, script: &str, target: &str) -> Result<String, FacilityError> {
        let output = self.runner.run_with_env(
            "powershell.exe",
            &["-NoProfile", "-NonInteractive", "-Command", script],
            &[(TARGET_VAR, target)],
        )?;
        let value = output.stdout.trim();
        if !output.success() || value.is_empty() {
            return Err(FacilityError::failed("translate", target, output.message()));
        }
        Ok(value.to_string())
    }
}

impl IdentityTranslator for SystemIdentities<'_> {
    fn name_to_sid(&self, name: &LoginName) -> Result<Sid, FacilityError> {
        if cfg!(windows) {
            let raw = self.powershell(NAME_TO_SID_SCRIPT, name.as_str())?;
            return Sid::parse(&raw).map_err(|e| FacilityError::failed("translate", name.as_str(), e));
        }

        let output = self.runner.run("id", &["-u", "--", name.account()])?;
        if !output.success() {
            return Err(FacilityError::failed("translate", name.as_str(), output.message()));
        }
        let uid: u32 = output
            .stdout
            .trim()
            .parse()
            .map_err(|_| FacilityError::failed("translate", name.as_str(), "unexpected id output"))?;
        Sid::parse(&unix_user_sid(uid))
            .map_err(|e| FacilityError::failed("translate", name.as_str(), e))
    }

    fn sid_to_name(&self, sid: &Sid) -> Result<LoginName, FacilityError> {
        let raw = if cfg!(windows) {
            self.powershell(SID_TO_NAME_SCRIPT, sid.as_str())?
        } else {
            let uid = uid_from_sid(sid)
                .ok_or_else(|| FacilityError::failed("translate", sid.as_str(), "not a Unix user SID"))?;
            let output = self.runner.run("id", &["-nu", &uid.to_string()])?;
            if !output.success() {
                return Err(FacilityError::failed("translate", sid.as_str(), output.message()));
            }
            output.stdout.trim().to_string()
        };

        LoginName::parse(&raw).map_err(|e| FacilityError::failed("translate", sid.as_str(), e))
    }
}

pub fn unix_user_sid(uid: u32) -> String {
    format!("{UNIX_USER_SID_PREFIX}{uid}")
}

pub fn uid_from_sid(sid: &Sid) -> Option<u32> {
    sid.as_str().strip_prefix(UNIX_USER_SID_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_sid_round_trip() {
        let sid = Sid::parse(&unix_user_sid(1000)).unwrap();
        assert_eq!(sid.as_str(), "S-1-22-1-1000");
        assert_eq!(uid_from_sid(&sid), Some(1000));
    }

    #[test]
    fn domain_sid_has_no_uid() {
        let sid = Sid::parse("S-1-5-21-1004336348-1177238915-682003330-1001").unwrap();
        assert_eq!(uid_from_sid(&sid), None);
    }
}
