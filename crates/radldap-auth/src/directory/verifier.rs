//! Credential verification by resolve-then-bind

use super::types::{RejectCause, VerificationOutcome};
use super::{CredentialVerifier, DirectoryConnector, IdentityResolver};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Resolves the username with the privileged session, then binds as the
/// resolved DN on a fresh connection. Every failure is a rejection.
#[derive(Clone)]
pub struct IdentityVerifier {
    resolver: Arc<dyn IdentityResolver>,
    connector: Arc<dyn DirectoryConnector>,
}

impl IdentityVerifier {
    pub fn new(resolver: Arc<dyn IdentityResolver>, connector: Arc<dyn DirectoryConnector>) -> Self {
        Self {
            resolver,
            connector,
        }
    }
}

#[async_trait]
impl CredentialVerifier for IdentityVerifier {
    async fn verify(&self, username: &str, password: &str) -> VerificationOutcome {
        // a simple bind with an empty password is an unauthenticated bind and succeeds
        if password.is_empty() {
            return VerificationOutcome::Rejected(RejectCause::EmptyPassword);
        }

        let identity = match self.resolver.resolve(username).await {
            Ok(identity) => identity,
            Err(e) => return VerificationOutcome::Rejected(e.into()),
        };

        let mut session = match self.connector.open().await {
            Ok(session) => session,
            Err(e) => return VerificationOutcome::Rejected(e.into()),
        };

        let bound = session.simple_bind(&identity.dn, password).await;
        session.close().await;

        match bound {
            Ok(()) => {
                debug!("Bind succeeded for {}", identity.dn);
                VerificationOutcome::Verified(identity.dn)
            }
            Err(e) => VerificationOutcome::Rejected(e.into()),
        }
    }
}
