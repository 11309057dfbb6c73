//! TLS client configuration for directory connections
//!
//! Provides:
//! - Client certificate and private key loading (mutual TLS)
//! - Mozilla trust anchors plus an optional CA bundle
//! - Server certificate verification against a configured server name

use radldap_core::config::DirectoryConfig;
use radldap_core::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Build the client configuration shared by every directory connection
pub fn build_client_config(config: &DirectoryConfig) -> Result<Arc<ClientConfig>> {
    let certs = load_certs(&config.cert_file, "certificate")?;
    info!("Loaded {} client certificate(s)", certs.len());

    let key = load_private_key(&config.key_file)?;
    info!("Loaded client private key");

    let roots = load_root_store(config.ca_file.as_deref())?;
    let server_name = ServerName::try_from(config.server_name().to_string()).map_err(|e| {
        Error::Tls(format!(
            "Invalid TLS server name {:?}: {}",
            config.server_name(),
            e
        ))
    })?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = PinnedNameVerifier::new(roots, provider.clone(), server_name)?;

    let client_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("TLS config error: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_client_auth_cert(certs, key)
        .map_err(|e| Error::Tls(format!("Error creating x509 key pair: {}", e)))?;

    Ok(Arc::new(client_config))
}

/// Load certificates from PEM file
fn load_certs(path: &Path, what: &'static str) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| Error::Certificate {
        what,
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Certificate {
            what,
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    if certs.is_empty() {
        return Err(Error::Certificate {
            what,
            path: path.display().to_string(),
            reason: "no certificates found".into(),
        });
    }

    Ok(certs)
}

/// Load private key from PEM file
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let key_error = |reason: String| Error::Certificate {
        what: "key",
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| key_error(e.to_string()))?;
    let mut reader = BufReader::new(file);

    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(rustls_pemfile::Item::Pkcs1Key(key))) => {
                return Ok(PrivateKeyDer::Pkcs1(key));
            }
            Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) => {
                return Ok(PrivateKeyDer::Pkcs8(key));
            }
            Ok(Some(rustls_pemfile::Item::Sec1Key(key))) => {
                return Ok(PrivateKeyDer::Sec1(key));
            }
            Ok(None) => break,
            Ok(Some(_)) => continue,
            Err(e) => return Err(key_error(e.to_string())),
        }
    }

    Err(key_error("no private key found".into()))
}

fn load_root_store(ca_file: Option<&Path>) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    if let Some(path) = ca_file {
        let extra = load_certs(path, "CA bundle")?;
        let (added, ignored) = roots.add_parsable_certificates(extra);
        info!("Loaded {} CA certificate(s) from {:?}", added, path);
        if added == 0 {
            return Err(Error::Certificate {
                what: "CA bundle",
                path: path.display().to_string(),
                reason: format!("none of {} certificate(s) usable", ignored),
            });
        }
    }

    Ok(roots)
}

/// WebPKI verification against a fixed server name.
///
/// ldap3 presents the dialed host as the server name; the directory's
/// certificate may be issued for a different name.
#[derive(Debug)]
struct PinnedNameVerifier {
    inner: Arc<WebPkiServerVerifier>,
    server_name: ServerName<'static>,
}

impl PinnedNameVerifier {
    fn new(
        roots: RootCertStore,
        provider: Arc<CryptoProvider>,
        server_name: ServerName<'static>,
    ) -> Result<Self> {
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| Error::Tls(format!("Failed to build server verifier: {}", e)))?;
        Ok(Self { inner, server_name })
    }
}

impl ServerCertVerifier for PinnedNameVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        self.inner.verify_server_cert(
            end_entity,
            intermediates,
            &self.server_name,
            ocsp_response,
            now,
        )
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
