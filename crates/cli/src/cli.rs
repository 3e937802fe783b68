//! Command-line surface.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser};

use fslreset_core::identity::IdentityError;
use fslreset_core::{Identity, LoginName, ResetConfig, ResetRequest, Sid};

/// Reset a user's profile containers: stop the agent service, delete the
/// local caches, optionally delete remote containers, restart the service.
#[derive(Debug, Parser)]
#[command(name = "fslreset", version, about)]
#[command(group(ArgGroup::new("identity").required(true).args(["user", "sid"])))]
pub struct Args {
    /// Login name of the target user (`alice` or `DOMAIN\alice`).
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Security identifier of the target user.
    #[arg(long, value_name = "SID")]
    pub sid: Option<String>,

    /// Also delete the user's containers on the configured remote shares.
    ///
    /// Shares are read from the registry on Windows. Elsewhere list them
    /// with --profile-location / --office-location.
    #[arg(long)]
    pub delete_remote: bool,

    /// Profile container share to search instead of the configured ones.
    #[arg(long = "profile-location", value_name = "PATH")]
    pub profile_locations: Vec<String>,

    /// Office container share to search instead of the configured ones.
    #[arg(long = "office-location", value_name = "PATH")]
    pub office_locations: Vec<String>,

    /// Describe every destructive action without performing it.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long)]
    pub log_json: bool,

    /// Override the agent service name.
    #[arg(long, value_name = "NAME")]
    pub service_name: Option<String>,

    /// Override the local cache base directory.
    #[arg(long, value_name = "DIR")]
    pub cache_root: Option<PathBuf>,

    /// Override the bounded wait for the service to stop.
    #[arg(long, value_name = "SECS")]
    pub stop_timeout_secs: Option<u64>,
}

impl Args {
    /// The identity supplied on the command line.
    pub fn identity(&self) -> Result<Identity, IdentityError> {
        match (&self.user, &self.sid) {
            (Some(name), _) => Ok(Identity::Name(LoginName::parse(name)?)),
            (None, Some(sid)) => Ok(Identity::Sid(Sid::parse(sid)?)),
            (None, None) => Err(IdentityError::Missing),
        }
    }

    pub fn request(&self) -> Result<ResetRequest, IdentityError> {
        Ok(ResetRequest {
            identity: self.identity()?,
            delete_remote: self.delete_remote,
            dry_run: self.dry_run,
        })
    }

    /// Apply command-line overrides on top of the environment configuration.
    pub fn apply_overrides(&self, config: &mut ResetConfig) {
        if let Some(name) = &self.service_name {
            config.service_name = name.trim().to_string();
        }
        if let Some(root) = &self.cache_root {
            config.cache_root = root.clone();
        }
        if let Some(secs) = self.stop_timeout_secs {
            config.stop_timeout = Duration::from_secs(secs);
        }
        if !self.profile_locations.is_empty() {
            config.profile_locations = Some(self.profile_locations.clone());
        }
        if !self.office_locations.is_empty() {
            config.office_locations = Some(self.office_locations.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn user_and_sid_are_mutually_exclusive() {
        let result = Args::try_parse_from(["fslreset", "--user", "alice", "--sid", "S-1-5-18"]);
        assert!(result.is_err());
    }

    #[test]
    fn one_identity_is_required() {
        assert!(Args::try_parse_from(["fslreset", "--dry-run"]).is_err());
    }

    #[test]
    fn parses_sid_request() {
        let args = Args::try_parse_from([
            "fslreset",
            "--sid",
            "S-1-5-21-1-2-3-1001",
            "--delete-remote",
            "--dry-run",
        ])
        .unwrap();
        let request = args.request().unwrap();

        assert_eq!(
            request.identity,
            Identity::Sid(Sid::parse("S-1-5-21-1-2-3-1001").unwrap())
        );
        assert!(request.delete_remote);
        assert!(request.dry_run);
    }

    #[test]
    fn malformed_sid_is_an_identity_error() {
        let args = Args::try_parse_from(["fslreset", "--sid", "not-a-sid"]).unwrap();
        assert!(matches!(args.request(), Err(IdentityError::InvalidSid(_))));
    }

    #[test]
    fn overrides_replace_configuration() {
        let args = Args::try_parse_from([
            "fslreset",
            "--user",
            "alice",
            "--service-name",
            "frxsvc2",
            "--cache-root",
            "/srv/fslogix",
            "--stop-timeout-secs",
            "40",
        ])
        .unwrap();
        let mut config = ResetConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.service_name, "frxsvc2");
        assert_eq!(config.cache_root, PathBuf::from("/srv/fslogix"));
        assert_eq!(config.stop_timeout, Duration::from_secs(40));
        assert_eq!(config.profile_locations, None);
    }

    #[test]
    fn location_flags_repeat() {
        let args = Args::try_parse_from([
            "fslreset",
            "--user",
            "alice",
            "--delete-remote",
            "--profile-location",
            "/srv/profiles",
            "--profile-location",
            "/srv/profiles-dr",
        ])
        .unwrap();
        let mut config = ResetConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(
            config.profile_locations,
            Some(vec!["/srv/profiles".to_string(), "/srv/profiles-dr".to_string()])
        );
        assert_eq!(config.office_locations, None);
    }
}
