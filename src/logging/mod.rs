//! Logger setup
//!
//! One subscriber for the whole process, writing every event both to
//! stderr and to a timestamped file under the configured log directory:
//!
//! ```text
//! [INFO] 2024-06-01 12:00:00,123: Building set KHM
//! ```
//!
//! The HTTP stack is limited to errors so retries and connection pooling do
//! not drown the pipeline's own messages.

use crate::error::{Result, UtilError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, Event, Level, Subscriber};
use tracing_subscriber::fmt::{self, format, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Environment flag enabling debug output
pub const DEBUG_ENV: &str = "MTGJSON5_DEBUG";
/// Environment override for the log directory
pub const LOG_DIR_ENV: &str = "MTGJSON5_LOG_DIR";

/// Crates whose output is limited to errors
const QUIET_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2"];

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit DEBUG events instead of stopping at INFO
    pub debug: bool,
    /// Directory receiving the log files
    pub log_dir: PathBuf,
    /// Log file name prefix
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_dir: PathBuf::from("logs"),
            file_prefix: "mtgjson".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Read the configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            debug: lookup(DEBUG_ENV).is_some_and(|value| is_truthy(&value)),
            log_dir: lookup(LOG_DIR_ENV).map_or(defaults.log_dir, PathBuf::from),
            file_prefix: defaults.file_prefix,
        }
    }

    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_log_dir<P: Into<PathBuf>>(mut self, log_dir: P) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Maximum level emitted by the pipeline
    pub const fn level(&self) -> Level {
        if self.debug {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }

    /// `EnvFilter` directives for this configuration
    pub fn filter_directives(&self) -> String {
        let mut directives = self.level().as_str().to_ascii_lowercase();
        for target in QUIET_TARGETS {
            directives.push_str(&format!(",{target}=error"));
        }
        directives
    }
}

/// `true`/`1` (any case) enable a flag
pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

/// Install the process-wide logger and return the path of the log file
///
/// # Errors
///
/// Fails if the log directory or file cannot be created, or if a global
/// subscriber is already installed.
pub fn init_logger(config: &LoggingConfig) -> Result<PathBuf> {
    fs::create_dir_all(&config.log_dir)?;

    let start_time = Local::now().format("%Y-%m-%d_%H.%M.%S");
    let log_path = config.log_dir.join(format!("{}_{start_time}.log", config.file_prefix));
    let log_file = File::create(&log_path)?;

    let filter = EnvFilter::try_new(config.filter_directives())
        .map_err(|e| UtilError::Logging(e.to_string()))?;

    let console_layer = fmt::layer()
        .event_format(LineFormat)
        .with_writer(std::io::stderr);
    let file_layer = fmt::layer()
        .event_format(LineFormat)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    Registry::default()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| UtilError::Logging(e.to_string()))?;

    info!("Logging to {}", log_path.display());
    Ok(log_path)
}

/// `[LEVEL] timestamp: message`
#[derive(Debug, Clone, Copy)]
struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S,%3f");
        write!(writer, "[{}] {}: ", event.metadata().level(), timestamp)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// In-memory log sink for asserting on emitted events
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// Plain-text subscriber writing every event into this sink
        pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync {
            tracing_subscriber::fmt()
                .with_writer(self.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::TRACE)
                .finish()
        }

        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(lookup_from(&[]));
        assert!(!config.debug);
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.level(), Level::INFO);
    }

    #[test]
    fn test_debug_flag_parsing() {
        for value in ["true", "TRUE", "1", " True "] {
            let config = LoggingConfig::from_lookup(lookup_from(&[(DEBUG_ENV, value)]));
            assert!(config.debug, "{value} should enable debug");
        }
        for value in ["false", "0", "yes", ""] {
            let config = LoggingConfig::from_lookup(lookup_from(&[(DEBUG_ENV, value)]));
            assert!(!config.debug, "{value} should not enable debug");
        }
    }

    #[test]
    fn test_filter_directives_quiet_http_stack() {
        let directives = LoggingConfig::default().with_debug(true).filter_directives();
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("reqwest=error"));
        assert!(directives.contains("hyper=error"));
    }

    #[test]
    fn test_init_logger_writes_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig::default().with_log_dir(dir.path().join("nested/logs"));

        let path = init_logger(&config).unwrap();
        assert!(path.is_file());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("mtgjson_") && name.ends_with(".log"));

        tracing::warn!("written to both sinks");
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[WARN] "));
        assert!(contents.contains(": written to both sinks"));

        // A second global subscriber is refused
        let err = init_logger(&config).unwrap_err();
        assert!(matches!(err, UtilError::Logging(_)));
    }
}
