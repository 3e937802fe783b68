//! Configured share locations from the Windows registry.
//!
//! Locations live under `HKEY_LOCAL_MACHINE\<root>` as a multi-string
//! value; some deployments use a single `;`-separated string instead.
//! Other hosts have no registry and must list locations explicitly
//! (`FSL_PROFILE_LOCATIONS`, `--profile-location` and the office
//! equivalents), which bypasses this source.

#[cfg(windows)]
use fslreset_core::config::split_locations;
use fslreset_core::facilities::ConfigSource;
use fslreset_core::FacilityError;

#[derive(Debug, Default, Clone, Copy)]
pub struct RegistryConfig;

impl ConfigSource for RegistryConfig {
    fn read_multi(&self, root: &str, value: &str) -> Result<Vec<String>, FacilityError> {
        read_values(root, value)
    }
}

#[cfg(windows)]
fn read_values(root: &str, value: &str) -> Result<Vec<String>, FacilityError> {
    use std::io::ErrorKind;

    use winreg::enums::HKEY_LOCAL_MACHINE;
    use winreg::RegKey;

    let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
    let key = match hklm.open_subkey(root) {
        Ok(key) => key,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(root, "Configuration root not present");
            return Ok(Vec::new());
        }
        Err(e) => return Err(FacilityError::failed("read registry", root, e)),
    };

    match key.get_value::<Vec<String>, _>(value) {
        Ok(values) => Ok(values
            .iter()
            .flat_map(|v| split_locations(v))
            .collect()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        // REG_SZ rather than REG_MULTI_SZ.
        Err(_) => key
            .get_value::<String, _>(value)
            .map(|raw| split_locations(&raw))
            .map_err(|e| FacilityError::failed("read registry", format!("{root}\\{value}"), e)),
    }
}

#[cfg(not(windows))]
fn read_values(_root: &str, _value: &str) -> Result<Vec<String>, FacilityError> {
    Err(FacilityError::Unsupported(
        "registry configuration; list share locations with FSL_PROFILE_LOCATIONS / FSL_OFFICE_LOCATIONS",
    ))
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn unsupported_without_registry_names_the_alternative() {
        let err = RegistryConfig
            .read_multi(r"SOFTWARE\FSLogix\Profiles", "VHDLocations")
            .unwrap_err();
        assert!(err.to_string().contains("FSL_PROFILE_LOCATIONS"));
    }
}
