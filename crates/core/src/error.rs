use crate::config::ConfigError;
use crate::identity::IdentityError;

/// Exit code used when administrative privilege is missing.
pub const EXIT_NOT_ELEVATED: u8 = 3;
/// Exit code used when the target identity cannot be resolved.
pub const EXIT_IDENTITY: u8 = 4;
/// Exit code used when the configuration is invalid.
pub const EXIT_CONFIG: u8 = 5;
/// Exit code used when the privilege level could not be determined.
pub const EXIT_PRIVILEGE_CHECK: u8 = 6;

/// Fatal errors that abort a reset before any mutation happens.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("Administrative privilege is required")]
    NotElevated,

    #[error("Could not determine privilege level: {0}")]
    PrivilegeCheck(#[source] FacilityError),

    #[error("Could not resolve user '{name}' to a SID: {source}")]
    IdentityResolution {
        name: String,
        #[source]
        source: FacilityError,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResetError {
    /// Process exit code for this error. Each fatal class has its own code.
    pub fn exit_code(&self) -> u8 {
        match self {
            ResetError::NotElevated => EXIT_NOT_ELEVATED,
            ResetError::PrivilegeCheck(_) => EXIT_PRIVILEGE_CHECK,
            ResetError::IdentityResolution { .. } | ResetError::Identity(_) => EXIT_IDENTITY,
            ResetError::Config(_) => EXIT_CONFIG,
        }
    }
}

/// Failure reported by one of the operating-system collaborators.
#[derive(Debug, thiserror::Error)]
pub enum FacilityError {
    #[error("{operation} failed for {target}: {message}")]
    Failed {
        operation: &'static str,
        target: String,
        message: String,
    },

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: String, secs: u64 },

    #[error("Not supported on this platform: {0}")]
    Unsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FacilityError {
    /// Shorthand for [`FacilityError::Failed`].
    pub fn failed(
        operation: &'static str,
        target: impl Into<String>,
        message: impl std::fmt::Display,
    ) -> Self {
        FacilityError::Failed {
            operation,
            target: target.into(),
            message: message.to_string(),
        }
    }
}
