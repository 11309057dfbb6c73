//! Access-Request handling

use async_trait::async_trait;
use radldap_auth::{CredentialVerifier, RejectCause, VerificationOutcome};
use radldap_radius::{Code, Handler, Request};
use std::sync::Arc;
use tracing::{debug, info};

/// Maps each Access-Request to Access-Accept or Access-Reject
pub struct AccessRequestHandler {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AccessRequestHandler {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    async fn check(&self, request: &Request) -> VerificationOutcome {
        match (request.user_name(), request.user_password()) {
            (Some(username), Some(password)) => self.verifier.verify(username, &password).await,
            _ => VerificationOutcome::Rejected(RejectCause::MissingCredentials),
        }
    }
}

#[async_trait]
impl Handler for AccessRequestHandler {
    async fn serve(&self, request: &Request) -> Code {
        let outcome = self.check(request).await;

        let code = if outcome.is_verified() {
            Code::AccessAccept
        } else {
            Code::AccessReject
        };

        if let Some(cause) = outcome.cause() {
            debug!(
                "Rejecting {:?} from {}: {}",
                request.user_name().unwrap_or_default(),
                request.remote_addr,
                cause
            );
        }
        info!("Writing {} to {}", code, request.remote_addr);

        code
    }
}
