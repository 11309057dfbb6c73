//! Error types for Radldap
//!
//! Every variant here is a startup-time failure. Per-request problems never
//! surface as an `Error`; they are folded into a reject by the verifier.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {what} {path}: {reason}")]
    Certificate {
        what: &'static str,
        path: String,
        reason: String,
    },

    #[error("TLS configuration error: {0}")]
    Tls(String),

    #[error("Error dialing directory server {addr}: {reason}")]
    Dial { addr: String, reason: String },

    #[error("Error binding as {identity}: {reason}")]
    Bind { identity: String, reason: String },

    #[error("Error starting RADIUS listener on {addr}: {reason}")]
    Listener { addr: String, reason: String },
}

impl Error {
    /// Short label for the startup stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "config",
            Error::Certificate { .. } | Error::Tls(_) => "tls",
            Error::Dial { .. } => "dial",
            Error::Bind { .. } => "bind",
            Error::Listener { .. } => "listen",
        }
    }
}
