//! Logging setup: stdout plus an append-only log file

use anyhow::Context;
use radldap_core::LoggingConfig;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Targets raised to `trace` when directory tracing is enabled
const TRACE_TARGETS: [&str; 2] = ["ldap3=trace", "radldap_auth=trace"];

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_logging(config: &LoggingConfig, trace_directory: bool) -> anyhow::Result<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.level.clone());
    let filter = env_filter(&level, trace_directory)?;
    let log_file = open_log_file(&config.file)?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .with(filter)
        .try_init()?;

    Ok(())
}

pub fn env_filter(level: &str, trace_directory: bool) -> anyhow::Result<EnvFilter> {
    let mut filter =
        EnvFilter::try_new(level).with_context(|| format!("Invalid log level {:?}", level))?;
    if trace_directory {
        for directive in TRACE_TARGETS {
            filter = filter.add_directive(directive.parse()?);
        }
    }
    Ok(filter)
}

fn open_log_file(path: &Path) -> anyhow::Result<File> {
    File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Write};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn emit_directory_traces(trace_directory: bool) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(move || writer.clone()),
            )
            .with(env_filter("info", trace_directory).unwrap());

        tracing::subscriber::with_default(subscriber, || {
            tracing::trace!(
                target: "radldap_auth::directory::session",
                "Binding as uid=alice,dc=example,dc=com"
            );
            tracing::trace!(target: "ldap3::conn", "sending bind request");
            tracing::trace!(target: "radldap_server", "unrelated detail");
        });

        let output = captured.0.lock().unwrap().clone();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_trace_flag_makes_directory_events_visible() {
        let output = emit_directory_traces(true);
        assert!(output.contains("Binding as uid=alice,dc=example,dc=com"));
        assert!(output.contains("sending bind request"));
        assert!(!output.contains("unrelated detail"));

        let output = emit_directory_traces(false);
        assert!(output.is_empty());
    }

    #[test]
    fn test_trace_directives() {
        let filter = env_filter("info", true).unwrap().to_string();
        assert!(filter.contains("ldap3=trace"));
        assert!(filter.contains("radldap_auth=trace"));

        let filter = env_filter("warn", false).unwrap().to_string();
        assert!(!filter.contains("ldap3"));
    }

    #[test]
    fn test_invalid_level() {
        assert!(env_filter("ldap3=verbose", false).is_err());
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radldap.log");

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_log_file_in_missing_directory() {
        let err = open_log_file(Path::new("/nonexistent/dir/radldap.log")).unwrap_err();
        assert!(err.to_string().contains("Failed to open log file"));
    }
}
