//! Startup wiring

use crate::handler::AccessRequestHandler;
use radldap_auth::{DirectoryEndpoint, IdentityVerifier, PrivilegedSession};
use radldap_core::BridgeConfig;
use radldap_radius::PacketServer;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

/// Read the TOML file at `path`, or the environment when there is none
pub fn load_config(path: Option<&str>) -> radldap_core::Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::from_file(path),
        None => Ok(BridgeConfig::from_env()),
    }
}

/// Connect to the directory, then serve RADIUS until `shutdown` resolves.
///
/// Fails without retrying if the directory cannot be reached, the service
/// bind is rejected, or the listener cannot be bound.
pub async fn run<F>(config: BridgeConfig, shutdown: F) -> radldap_core::Result<()>
where
    F: Future<Output = ()>,
{
    let directory = &config.directory;
    info!(
        "Directory server: {}:{} (server name {}), search base {}",
        directory.host,
        directory.port,
        directory.server_name(),
        directory.search_base
    );

    let endpoint = Arc::new(DirectoryEndpoint::from_config(directory)?);
    let session = PrivilegedSession::initialize(
        &endpoint,
        &directory.bind_dn,
        &directory.bind_password,
        &directory.search_base,
    )
    .await?;

    let verifier = IdentityVerifier::new(Arc::new(session), endpoint);
    let handler = Arc::new(AccessRequestHandler::new(Arc::new(verifier)));
    let server = PacketServer::new(handler, config.radius.secret.expose().as_bytes());

    server
        .listen_and_serve(&config.radius.listen_addr(), shutdown)
        .await
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radldap_core::{Error, Secret};
    use std::io::Write;

    #[test]
    fn test_load_config_failure_is_a_config_error() {
        let err = load_config(Some("/nonexistent/radldap.toml")).unwrap_err();
        assert_eq!(err.stage(), "config");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[directory\nhost = ").unwrap();
        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(err.stage(), "config");
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_certificate() {
        let mut config = BridgeConfig::default();
        config.directory.host = "127.0.0.1".to_string();
        config.directory.bind_dn = "cn=svc,dc=example,dc=com".to_string();
        config.directory.search_base = "dc=example,dc=com".to_string();
        config.directory.cert_file = "/nonexistent/ldap.crt".into();
        config.directory.key_file = "/nonexistent/ldap.key".into();
        config.radius.secret = Secret::new("testing123");

        let err = run(config, std::future::pending()).await.unwrap_err();
        assert!(matches!(err, Error::Certificate { .. }));
        assert_eq!(err.stage(), "tls");
    }

    #[tokio::test]
    async fn test_run_fails_on_empty_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let cert = dir.path().join("ldap.crt");
        let key = dir.path().join("ldap.key");
        std::fs::File::create(&cert)
            .unwrap()
            .write_all(b"not a certificate")
            .unwrap();
        std::fs::File::create(&key).unwrap();

        let mut config = BridgeConfig::default();
        config.directory.host = "127.0.0.1".to_string();
        config.directory.cert_file = cert;
        config.directory.key_file = key;

        let err = run(config, std::future::pending()).await.unwrap_err();
        assert_eq!(err.stage(), "tls");
    }
}
