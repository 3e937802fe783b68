//! In-memory fakes for every collaborator the reset procedure uses.
//!
//! [`FakeHost`] implements all facility traits over a single mutable
//! state and records every call, so tests can assert both on the
//! resulting filesystem and on the order of operations.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use glob::{MatchOptions, Pattern};

use fslreset_core::config::{DEFAULT_OFFICE_CONFIG_KEY, DEFAULT_PROFILE_CONFIG_KEY};
use fslreset_core::facilities::{
    ConfigSource, Facilities, FileSystem, IdentityTranslator, Privileges, ServiceControl,
    ServiceState,
};
use fslreset_core::{FacilityError, LoginName, ResetConfig, Sid};

pub const SID: &str = "S-1-5-21-1004336348-1177238915-682003330-1001";
pub const NAME: &str = "alice";
pub const CACHE_ROOT: &str = "/fslogix";
pub const PROFILE_SHARE: &str = "/shares/profiles";
pub const OFFICE_SHARE: &str = "/shares/office";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    IsElevated,
    NameToSid(String),
    SidToName(String),
    Status,
    Stop,
    Start,
    ReadMulti(String),
    Glob(String),
    ClearAttributes(PathBuf),
    Remove(PathBuf),
}

impl Call {
    /// Whether the call changes service or filesystem state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::Stop | Call::Start | Call::ClearAttributes(_) | Call::Remove(_)
        )
    }
}

pub struct FakeState {
    pub elevated: bool,
    pub service: ServiceState,
    stop_requested: bool,
    /// Status polls after a stop request before the service reports
    /// stopped. `None` means it never stops.
    pub stop_polls: Option<u32>,
    pub start_fails: bool,
    pub dirs: BTreeSet<PathBuf>,
    pub files: BTreeSet<PathBuf>,
    /// Paths whose removal fails as if another process held them open.
    pub locked: BTreeSet<PathBuf>,
    /// Paths whose existence cannot be determined (access denied).
    pub unreadable: BTreeSet<PathBuf>,
    pub panic_on_remove: Option<PathBuf>,
    pub registry: HashMap<String, Vec<String>>,
    /// `(name, sid)` pairs known to the identity translator.
    pub accounts: Vec<(String, String)>,
    pub reverse_lookup_fails: bool,
    pub calls: Vec<Call>,
}

pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    /// An elevated host with a running agent, both local caches present,
    /// one share per category and a handful of container files.
    pub fn populated() -> Self {
        let host = Self::empty();
        {
            let mut s = host.state();
            s.service = ServiceState::Running;
            s.accounts.push((NAME.into(), SID.into()));

            for category in ["Cache", "Proxy"] {
                let dir = cache_dir(category);
                s.files.insert(dir.join("Profile_alice.vhdx"));
                s.dirs.insert(dir);
            }

            s.registry
                .insert(DEFAULT_PROFILE_CONFIG_KEY.into(), vec![PROFILE_SHARE.into()]);
            s.registry
                .insert(DEFAULT_OFFICE_CONFIG_KEY.into(), vec![OFFICE_SHARE.into()]);

            for file in [
                format!("{PROFILE_SHARE}/alice.vhdx"),
                format!("{PROFILE_SHARE}/{SID}_alice/Profile_alice.vhdx"),
                format!("{PROFILE_SHARE}/bob.vhdx"),
                format!("{OFFICE_SHARE}/alice_{SID}/ODFC_alice.VHDX"),
            ] {
                s.files.insert(PathBuf::from(file));
            }
        }
        host
    }

    /// An elevated host with nothing installed and nothing on disk.
    pub fn empty() -> Self {
        Self {
            state: Mutex::new(FakeState {
                elevated: true,
                service: ServiceState::NotInstalled,
                stop_requested: false,
                stop_polls: Some(0),
                start_fails: false,
                dirs: BTreeSet::new(),
                files: BTreeSet::new(),
                locked: BTreeSet::new(),
                unreadable: BTreeSet::new(),
                panic_on_remove: None,
                registry: HashMap::new(),
                accounts: Vec::new(),
                reverse_lookup_fails: false,
                calls: Vec::new(),
            }),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn facilities(&self) -> Facilities<'_> {
        Facilities {
            privileges: self,
            services: self,
            config_source: self,
            fs: self,
            identities: self,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.state().files.contains(Path::new(path))
    }

    pub fn has_dir(&self, path: &Path) -> bool {
        self.state().dirs.contains(path)
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

pub fn cache_dir(category: &str) -> PathBuf {
    Path::new(CACHE_ROOT).join(category).join(SID)
}

pub fn test_config() -> ResetConfig {
    ResetConfig {
        cache_root: PathBuf::from(CACHE_ROOT),
        stop_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(1),
        ..ResetConfig::default()
    }
}

impl Privileges for FakeHost {
    fn is_elevated(&self) -> Result<bool, FacilityError> {
        self.record(Call::IsElevated);
        Ok(self.state().elevated)
    }
}

impl ServiceControl for FakeHost {
    fn status(&self, _name: &str) -> Result<ServiceState, FacilityError> {
        let mut s = self.state();
        s.calls.push(Call::Status);
        if s.stop_requested {
            let polls = s.stop_polls;
            match polls {
                Some(0) => {
                    s.service = ServiceState::Stopped;
                    s.stop_requested = false;
                }
                Some(n) => {
                    s.stop_polls = Some(n - 1);
                    s.service = ServiceState::Pending;
                }
                None => s.service = ServiceState::Pending,
            }
        }
        Ok(s.service)
    }

    fn stop(&self, _name: &str) -> Result<(), FacilityError> {
        let mut s = self.state();
        s.calls.push(Call::Stop);
        s.stop_requested = true;
        Ok(())
    }

    fn start(&self, name: &str) -> Result<(), FacilityError> {
        let mut s = self.state();
        s.calls.push(Call::Start);
        if s.start_fails {
            return Err(FacilityError::failed("start", name, "service failed to start"));
        }
        s.service = ServiceState::Running;
        s.stop_requested = false;
        Ok(())
    }
}

impl ConfigSource for FakeHost {
    fn read_multi(&self, root: &str, _value: &str) -> Result<Vec<String>, FacilityError> {
        let mut s = self.state();
        s.calls.push(Call::ReadMulti(root.to_string()));
        Ok(s.registry.get(root).cloned().unwrap_or_default())
    }
}

impl FileSystem for FakeHost {
    fn exists(&self, path: &Path) -> Result<bool, FacilityError> {
        let s = self.state();
        if s.unreadable.contains(path) {
            return Err(FacilityError::failed(
                "inspect",
                path.display().to_string(),
                "Access is denied",
            ));
        }
        Ok(s.dirs.contains(path) || s.files.contains(path))
    }

    fn clear_attributes(&self, path: &Path, _recursive: bool) -> Result<(), FacilityError> {
        self.record(Call::ClearAttributes(path.to_path_buf()));
        Ok(())
    }

    fn remove(&self, path: &Path, recursive: bool) -> Result<(), FacilityError> {
        let should_panic = {
            let mut s = self.state();
            s.calls.push(Call::Remove(path.to_path_buf()));
            s.panic_on_remove.as_deref() == Some(path)
        };
        if should_panic {
            panic!("simulated crash while removing {}", path.display());
        }

        let mut s = self.state();
        if s.locked.contains(path) {
            return Err(FacilityError::failed(
                "remove",
                path.display().to_string(),
                "The process cannot access the file because it is being used by another process",
            ));
        }
        if recursive {
            s.dirs.retain(|d| !d.starts_with(path));
            s.files.retain(|f| !f.starts_with(path));
        } else {
            s.files.remove(path);
        }
        Ok(())
    }

    fn glob(&self, pattern: &str) -> Result<Vec<PathBuf>, FacilityError> {
        let mut s = self.state();
        s.calls.push(Call::Glob(pattern.to_string()));
        let compiled =
            Pattern::new(pattern).map_err(|e| FacilityError::failed("glob", pattern, e))?;
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            ..MatchOptions::default()
        };
        Ok(s.files
            .iter()
            .filter(|f| compiled.matches_path_with(f, options))
            .cloned()
            .collect())
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        self.state().files.contains(path).then_some(4 * 1024 * 1024)
    }
}

impl IdentityTranslator for FakeHost {
    fn name_to_sid(&self, name: &LoginName) -> Result<Sid, FacilityError> {
        let mut s = self.state();
        s.calls.push(Call::NameToSid(name.to_string()));
        let sid = s
            .accounts
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.account()))
            .map(|(_, sid)| sid.clone())
            .ok_or_else(|| {
                FacilityError::failed("translate", name.to_string(), "account not found")
            })?;
        Sid::parse(&sid).map_err(|e| FacilityError::failed("translate", name.to_string(), e))
    }

    fn sid_to_name(&self, sid: &Sid) -> Result<LoginName, FacilityError> {
        let mut s = self.state();
        s.calls.push(Call::SidToName(sid.to_string()));
        if s.reverse_lookup_fails {
            return Err(FacilityError::failed("translate", sid.to_string(), "no mapping"));
        }
        let name = s
            .accounts
            .iter()
            .find(|(_, candidate)| candidate == sid.as_str())
            .map(|(name, _)| name.clone())
            .ok_or_else(|| FacilityError::failed("translate", sid.to_string(), "no mapping"))?;
        LoginName::parse(&name).map_err(|e| FacilityError::failed("translate", sid.to_string(), e))
    }
}
