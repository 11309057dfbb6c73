//! Directory sessions
//!
//! A [`PrivilegedSession`] is opened once at startup, bound as the service
//! identity, and used only for searches. Every credential check dials its
//! own [`EphemeralSession`] so the user's bind never touches the
//! privileged connection.

use super::types::{
    ConnectionDriver, DirectoryEndpoint, DirectoryError, DistinguishedName, ResolvedIdentity,
    SearchQuery,
};
use super::{DirectoryConnector, EphemeralBind, IdentityResolver};
use async_trait::async_trait;
use ldap3::{Ldap, Scope, SearchEntry};
use radldap_core::config::Secret;
use radldap_core::{Error, Result};
use tracing::{debug, info, trace, warn};

/// Long-lived connection bound as the service identity
pub struct PrivilegedSession {
    ldap: Ldap,
    search_base: String,
    _driver: ConnectionDriver,
}

impl PrivilegedSession {
    /// Dial the directory and bind as the service identity.
    ///
    /// Any failure here is fatal to startup.
    pub async fn initialize(
        endpoint: &DirectoryEndpoint,
        identity: &str,
        password: &Secret,
        search_base: &str,
    ) -> Result<Self> {
        let (mut ldap, driver) = endpoint.connect().await.map_err(|e| Error::Dial {
            addr: endpoint.url(),
            reason: e.to_string(),
        })?;

        ldap.simple_bind(identity, password.expose())
            .await
            .and_then(|r| r.success())
            .map_err(|e| Error::Bind {
                identity: identity.to_string(),
                reason: e.to_string(),
            })?;

        info!("Bound to {} as {}", endpoint.url(), identity);

        Ok(Self {
            ldap,
            search_base: search_base.to_string(),
            _driver: driver,
        })
    }

    async fn search(&self, query: &SearchQuery) -> std::result::Result<Vec<SearchEntry>, DirectoryError> {
        trace!("Searching {} with filter {}", query.base, query.filter);

        // handles share the connection; requests are multiplexed by message id
        let mut ldap = self.ldap.clone();
        let (entries, _) = ldap
            .search(
                &query.base,
                Scope::Subtree,
                &query.filter,
                query.attributes.clone(),
            )
            .await
            .and_then(|r| r.success())
            .map_err(|e| DirectoryError::Search(e.to_string()))?;

        Ok(entries.into_iter().map(SearchEntry::construct).collect())
    }
}

#[async_trait]
impl IdentityResolver for PrivilegedSession {
    async fn resolve(&self, username: &str) -> std::result::Result<ResolvedIdentity, DirectoryError> {
        let query = SearchQuery::for_username(&self.search_base, username);
        let identity = single_identity(self.search(&query).await?)?;
        debug!(
            "Resolved {} to {} (cn: {:?})",
            username, identity.dn, identity.common_name
        );
        Ok(identity)
    }
}

/// Exactly one entry resolves; none or several is a failure
fn single_identity(entries: Vec<SearchEntry>) -> std::result::Result<ResolvedIdentity, DirectoryError> {
    for entry in &entries {
        trace!(
            "Search result: {} (cn: {:?})",
            entry.dn,
            entry.attrs.get("cn").and_then(|v| v.first())
        );
    }

    let mut entries = entries.into_iter();
    match (entries.next(), entries.len()) {
        (None, _) => Err(DirectoryError::UnknownIdentity),
        (Some(entry), 0) => {
            let common_name = entry.attrs.get("cn").and_then(|v| v.first()).cloned();
            Ok(ResolvedIdentity {
                dn: DistinguishedName::new(entry.dn),
                common_name,
            })
        }
        (Some(_), rest) => Err(DirectoryError::AmbiguousIdentity(rest + 1)),
    }
}

/// Short-lived connection that carries exactly one user bind
pub struct EphemeralSession {
    ldap: Ldap,
    _driver: ConnectionDriver,
}

#[async_trait]
impl EphemeralBind for EphemeralSession {
    async fn simple_bind(
        &mut self,
        dn: &DistinguishedName,
        password: &str,
    ) -> std::result::Result<(), DirectoryError> {
        trace!("Binding as {}", dn);
        self.ldap
            .simple_bind(dn.as_str(), password)
            .await
            .and_then(|r| r.success())
            .map(|_| ())
            .map_err(|e| DirectoryError::Bind(e.to_string()))
    }

    async fn close(self: Box<Self>) {
        let mut session = self;
        trace!("Unbinding ephemeral session");
        if let Err(e) = session.ldap.unbind().await {
            warn!("Failed to unbind ephemeral session: {}", e);
        }
    }
}

#[async_trait]
impl DirectoryConnector for DirectoryEndpoint {
    async fn open(&self) -> std::result::Result<Box<dyn EphemeralBind>, DirectoryError> {
        trace!("Dialing ephemeral session to {}", self.url());
        let (ldap, driver) = self
            .connect()
            .await
            .map_err(|e| DirectoryError::Connect(e.to_string()))?;
        Ok(Box::new(EphemeralSession {
            ldap,
            _driver: driver,
        }))
    }
}
