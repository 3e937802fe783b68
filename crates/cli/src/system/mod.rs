//! Host implementations of the reset facilities.

pub mod command;
pub mod filesystem;
pub mod identity;
pub mod privilege;
pub mod registry;
pub mod service;

pub use command::CommandRunner;
pub use filesystem::LocalFileSystem;
pub use identity::SystemIdentities;
pub use privilege::SystemPrivileges;
pub use registry::RegistryConfig;
pub use service::SystemServices;
