//! Radldap - RADIUS to LDAP credential bridge
//!
//! Answers RADIUS Access-Requests by binding to the directory as the user.

use clap::Parser;
use radldap_core::config::BridgeConfig;
use radldap_server::{app, logging};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "radldap")]
#[command(author = "Radldap Team")]
#[command(version = radldap_core::VERSION)]
#[command(about = "RADIUS to LDAP credential bridge", long_about = None)]
struct Cli {
    /// Configuration file path (TOML); the environment is used otherwise
    #[arg(short, long)]
    config: Option<String>,

    /// RADIUS bind address
    #[arg(long, env = "RADIUS_BIND_ADDRESS")]
    bind: Option<String>,

    /// RADIUS port
    #[arg(short, long, env = "RADIUS_PORT")]
    port: Option<u16>,

    /// Log file, appended to
    #[arg(long, env = "RADLDAP_LOG_FILE")]
    log_file: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RADLDAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Trace directory protocol traffic
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // A config file that fails to load is reported once logging is up
    let (mut config, load_error) = match app::load_config(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (BridgeConfig::default(), Some(e)),
    };

    // Override with CLI args
    if let Some(bind) = cli.bind {
        config.radius.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.radius.port = port;
    }
    if let Some(log_file) = cli.log_file {
        config.logging.file = log_file.into();
    }
    if let Some(log_level) = cli.log_level {
        config.logging.level = log_level;
    }
    if cli.debug {
        config.directory.debug = true;
    }

    logging::init_logging(&config.logging, config.directory.debug)?;
    info!("Starting radldap {}", radldap_core::VERSION);

    let result = match load_error {
        Some(e) => Err(e),
        None => match config.validate() {
            Ok(()) => app::run(config, app::shutdown_signal()).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        error!(stage = e.stage(), "{}", e);
        std::process::exit(1);
    }

    info!("Shut down");
    Ok(())
}
