//! Directory authentication for Radldap

pub mod directory;
pub mod tls;

pub use directory::{
    CredentialVerifier, DirectoryConnector, DirectoryEndpoint, DirectoryError,
    DistinguishedName, EphemeralBind, EphemeralSession, IdentityResolver, IdentityVerifier,
    PrivilegedSession, RejectCause, ResolvedIdentity, SearchQuery, VerificationOutcome,
};
pub use tls::build_client_config;
