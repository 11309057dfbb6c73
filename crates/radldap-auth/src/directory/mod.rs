//! Directory access: identity resolution and credential verification

mod session;
mod types;
mod verifier;

pub use session::{EphemeralSession, PrivilegedSession};
pub use types::{
    DirectoryEndpoint, DirectoryError, DistinguishedName, RejectCause, ResolvedIdentity,
    SearchQuery, VerificationOutcome, USER_ATTRIBUTES,
};
pub use verifier::IdentityVerifier;

use async_trait::async_trait;

/// Maps a username to exactly one directory entry
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, username: &str) -> Result<ResolvedIdentity, DirectoryError>;
}

/// Opens a fresh connection for a single bind
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn EphemeralBind>, DirectoryError>;
}

#[async_trait]
pub trait EphemeralBind: Send {
    async fn simple_bind(
        &mut self,
        dn: &DistinguishedName,
        password: &str,
    ) -> Result<(), DirectoryError>;

    /// Unbind and release the connection
    async fn close(self: Box<Self>);
}

/// Answers whether a username and password are valid
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> VerificationOutcome;
}
