//! `fslreset-cli` -- host side of the profile container reset tool.
//!
//! Implements the reset facilities against the running system (service
//! manager, registry, filesystem, account database) and exposes the
//! command-line surface used by the `fslreset` binary.

pub mod cli;
pub mod output;
pub mod system;
