//! Directory types shared by the session manager and the verifier

use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError};
use radldap_core::config::DirectoryConfig;
use rustls::ClientConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Attributes fetched for a user entry
pub const USER_ATTRIBUTES: [&str; 2] = ["dn", "cn"];

/// Errors from a single directory operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Failed to connect to directory server: {0}")]
    Connect(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("User does not exist")]
    UnknownIdentity,

    #[error("Too many entries returned: {0}")]
    AmbiguousIdentity(usize),

    #[error("Bind failed: {0}")]
    Bind(String),
}

/// Canonical identifier of a directory entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DistinguishedName(String);

impl DistinguishedName {
    pub fn new(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of resolving a username to exactly one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub dn: DistinguishedName,
    pub common_name: Option<String>,
}

/// Subtree search for a person entry by uid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub base: String,
    pub filter: String,
    pub attributes: Vec<&'static str>,
}

impl SearchQuery {
    /// The username is escaped per RFC 4515 before it enters the filter
    pub fn for_username(base: &str, username: &str) -> Self {
        Self {
            base: base.to_string(),
            filter: format!(
                "(&(objectClass=person)(uid={}))",
                ldap3::ldap_escape(username)
            ),
            attributes: USER_ATTRIBUTES.to_vec(),
        }
    }
}

/// Where and how to reach the directory. Immutable once built.
#[derive(Clone)]
pub struct DirectoryEndpoint {
    host: String,
    port: u16,
    server_name: String,
    tls: Arc<ClientConfig>,
    connect_timeout: Duration,
}

impl fmt::Debug for DirectoryEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("server_name", &self.server_name)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl DirectoryEndpoint {
    pub fn new(config: &DirectoryConfig, tls: Arc<ClientConfig>) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            server_name: config.server_name().to_string(),
            tls,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    /// Load the TLS material named in `config` and build the endpoint
    pub fn from_config(config: &DirectoryConfig) -> radldap_core::Result<Self> {
        let tls = crate::tls::build_client_config(config)?;
        Ok(Self::new(config, tls))
    }

    pub fn url(&self) -> String {
        if self.host.contains(':') {
            format!("ldaps://[{}]:{}", self.host, self.port)
        } else {
            format!("ldaps://{}:{}", self.host, self.port)
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Dial a new TLS connection and start its driver task
    pub(crate) async fn connect(&self) -> Result<(Ldap, ConnectionDriver), LdapError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.connect_timeout)
            .set_config(self.tls.clone());

        let url = self.url();
        debug!("Connecting to directory server: {}", url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &url).await?;
        Ok((ldap, ConnectionDriver::spawn(conn)))
    }
}

/// Owns the task pumping a connection; aborting it closes the socket
#[derive(Debug)]
pub(crate) struct ConnectionDriver(JoinHandle<()>);

impl ConnectionDriver {
    fn spawn(conn: LdapConnAsync) -> Self {
        Self(tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("Directory connection terminated: {}", e);
            }
        }))
    }
}

impl Drop for ConnectionDriver {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Why a credential check did not succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectCause {
    #[error("request is missing User-Name or User-Password")]
    MissingCredentials,

    #[error("empty password")]
    EmptyPassword,

    #[error("directory search failed: {0}")]
    SearchFailed(String),

    #[error("user does not exist")]
    UnknownIdentity,

    #[error("{0} entries matched the username")]
    AmbiguousIdentity(usize),

    #[error("could not reach directory server: {0}")]
    ConnectFailed(String),

    #[error("bind rejected: {0}")]
    BindRejected(String),
}

impl From<DirectoryError> for RejectCause {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::UnknownIdentity => RejectCause::UnknownIdentity,
            DirectoryError::AmbiguousIdentity(n) => RejectCause::AmbiguousIdentity(n),
            DirectoryError::Search(e) => RejectCause::SearchFailed(e),
            DirectoryError::Connect(e) => RejectCause::ConnectFailed(e),
            DirectoryError::Bind(e) => RejectCause::BindRejected(e),
        }
    }
}

/// Outcome of one verification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified(DistinguishedName),
    Rejected(RejectCause),
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified(_))
    }

    pub fn cause(&self) -> Option<&RejectCause> {
        match self {
            VerificationOutcome::Rejected(cause) => Some(cause),
            VerificationOutcome::Verified(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_filter() {
        let query = SearchQuery::for_username("dc=example,dc=com", "alice");
        assert_eq!(query.base, "dc=example,dc=com");
        assert_eq!(query.filter, "(&(objectClass=person)(uid=alice))");
        assert_eq!(query.attributes, vec!["dn", "cn"]);
    }

    #[test]
    fn test_search_query_escapes_username() {
        let query = SearchQuery::for_username("dc=example,dc=com", "*)(uid=*");
        assert_eq!(
            query.filter,
            "(&(objectClass=person)(uid=\\2a\\29\\28uid=\\2a))"
        );
    }

    #[test]
    fn test_outcome_helpers() {
        let verified = VerificationOutcome::Verified(DistinguishedName::new("uid=alice"));
        assert!(verified.is_verified());
        assert_eq!(verified.cause(), None);

        let rejected = VerificationOutcome::Rejected(DirectoryError::AmbiguousIdentity(2).into());
        assert!(!rejected.is_verified());
        assert_eq!(rejected.cause(), Some(&RejectCause::AmbiguousIdentity(2)));
    }
}
