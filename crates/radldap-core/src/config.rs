//! Configuration for Radldap

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub radius: RadiusConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::InvalidConfig(format!("Failed to read config {}: {}", path, e))
        })?;

        toml::from_str(&content)
            .map_err(|e| crate::Error::InvalidConfig(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Unset variables keep their defaults; unparsable numbers are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(identity) = lookup("LDAP_BIND_USERNAME") {
            config.directory.bind_dn = identity;
        }
        if let Some(password) = lookup("LDAP_BIND_PASSWORD") {
            config.directory.bind_password = Secret::new(password);
        }
        if let Some(base) = lookup("LDAP_DC") {
            config.directory.search_base = base;
        }
        if let Some(cert) = lookup("CRT_FILENAME") {
            config.directory.cert_file = PathBuf::from(cert);
        }
        if let Some(key) = lookup("KEY_FILENAME") {
            config.directory.key_file = PathBuf::from(key);
        }
        if let Some(host) = lookup("LDAP_SERVER") {
            config.directory.host = host;
        }
        if let Some(port) = lookup("LDAP_PORT") {
            if let Ok(p) = port.parse() {
                config.directory.port = p;
            }
        }
        if let Some(name) = lookup("LDAP_TLS_SERVER_NAME") {
            config.directory.tls_server_name = Some(name);
        }
        if let Some(ca) = lookup("LDAP_CA_FILE") {
            config.directory.ca_file = Some(PathBuf::from(ca));
        }
        if let Some(timeout) = lookup("LDAP_CONNECT_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                config.directory.connect_timeout_secs = t;
            }
        }
        if let Some(debug) = lookup("DEBUG") {
            config.directory.debug = debug == "true";
        }

        if let Some(secret) = lookup("RADIUS_SECRET") {
            config.radius.secret = Secret::new(secret);
        }
        if let Some(addr) = lookup("RADIUS_BIND_ADDRESS") {
            config.radius.bind_address = addr;
        }
        if let Some(port) = lookup("RADIUS_PORT") {
            if let Ok(p) = port.parse() {
                config.radius.port = p;
            }
        }

        if let Some(file) = lookup("RADLDAP_LOG_FILE") {
            config.logging.file = PathBuf::from(file);
        }
        if let Some(level) = lookup("RADLDAP_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.directory.validate()?;
        self.radius.validate()
    }
}

/// String value that never shows up in `Debug` output
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Directory server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory server host name or address
    pub host: String,

    /// LDAPS port
    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Name the server certificate must match; defaults to `host`
    #[serde(default)]
    pub tls_server_name: Option<String>,

    /// Service account identity used for searches
    pub bind_dn: String,

    /// Service account password
    pub bind_password: Secret,

    /// Subtree searched for user entries
    /// Example: "dc=example,dc=com"
    pub search_base: String,

    /// Client certificate presented to the directory (PEM)
    pub cert_file: PathBuf,

    /// Client private key (PEM)
    pub key_file: PathBuf,

    /// Extra trust anchors for the server certificate (PEM)
    #[serde(default)]
    pub ca_file: Option<PathBuf>,

    /// Transport connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Trace directory protocol traffic
    #[serde(default)]
    pub debug: bool,
}

fn default_ldap_port() -> u16 {
    crate::LDAPS_PORT
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_ldap_port(),
            tls_server_name: None,
            bind_dn: String::new(),
            bind_password: Secret::default(),
            search_base: String::new(),
            cert_file: PathBuf::new(),
            key_file: PathBuf::new(),
            ca_file: None,
            connect_timeout_secs: default_connect_timeout(),
            debug: false,
        }
    }
}

impl DirectoryConfig {
    /// Server name checked against the directory's certificate
    pub fn server_name(&self) -> &str {
        self.tls_server_name.as_deref().unwrap_or(&self.host)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Directory server host is required (LDAP_SERVER)".into(),
            ));
        }
        if self.port == 0 {
            return Err(crate::Error::InvalidConfig(
                "Directory server port must be non-zero (LDAP_PORT)".into(),
            ));
        }
        if self.bind_dn.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Bind identity is required (LDAP_BIND_USERNAME)".into(),
            ));
        }
        if self.search_base.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Search base is required (LDAP_DC)".into(),
            ));
        }
        if self.cert_file.as_os_str().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Client certificate path is required (CRT_FILENAME)".into(),
            ));
        }
        if self.key_file.as_os_str().is_empty() {
            return Err(crate::Error::InvalidConfig(
                "Client key path is required (KEY_FILENAME)".into(),
            ));
        }
        Ok(())
    }
}

/// RADIUS listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadiusConfig {
    pub bind_address: String,
    pub port: u16,
    /// Shared secret authenticating NAS clients
    pub secret: Secret,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: crate::RADIUS_AUTH_PORT,
            secret: Secret::default(),
        }
    }
}

impl RadiusConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.secret.is_empty() {
            return Err(crate::Error::InvalidConfig(
                "RADIUS shared secret is required (RADIUS_SECRET)".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from(crate::DEFAULT_LOG_FILE),
        }
    }
}
