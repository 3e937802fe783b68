//! `fslreset-core` -- profile container reset logic.
//!
//! Pure procedure and data model with no direct operating-system access.
//! Every side effect goes through the traits in [`facilities`], which the
//! `fslreset-cli` crate implements for the host.

pub mod candidates;
pub mod config;
pub mod error;
pub mod facilities;
pub mod identity;
pub mod procedure;
pub mod report;

pub use config::ResetConfig;
pub use error::{FacilityError, ResetError};
pub use facilities::Facilities;
pub use identity::{Identity, LoginName, ResolvedIdentity, Sid};
pub use procedure::{run_reset, ResetRequest};
pub use report::RunReport;
