//! Radldap Core Library
//!
//! Configuration, error types and protocol constants shared by the
//! RADIUS-to-LDAP bridge crates.

pub mod config;
pub mod error;

pub use config::{BridgeConfig, DirectoryConfig, LoggingConfig, RadiusConfig, Secret};
pub use error::{Error, Result};

/// Radldap version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Well-known RADIUS authentication port
pub const RADIUS_AUTH_PORT: u16 = 1812;

/// Default LDAPS port
pub const LDAPS_PORT: u16 = 636;

/// Default log file, appended to across restarts
pub const DEFAULT_LOG_FILE: &str = "gsuiteldapradius.log";
