//! Process configuration
//!
//! Every collaborator takes its settings in its constructor. [`Config`]
//! gathers them in one place and loads them from the environment:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `MTGJSON5_DEBUG` | `true`/`1` enables DEBUG logging |
//! | `MTGJSON5_LOG_DIR` | log directory, default `./logs` |
//! | `MTGJSON5_CACHE` | `true`/`1` enables the HTTP response cache |
//! | `MTGJSON5_CACHE_DIR` | cache directory, default `./.mtgjson5_cache` |
//! | `MTGJSON5_PUSHOVER_APP_TOKEN` | Pushover application token |
//! | `MTGJSON5_PUSHOVER_USER_TOKENS` | comma separated Pushover user tokens |
//! | `MTGJSON5_HASH_ALGORITHM` | file digest algorithm, default `sha256` |

use crate::error::Result;
use crate::hashing::FileHasher;
use crate::http::{HttpConfig, SessionFactory};
use crate::logging::LoggingConfig;
use crate::notify::{PushoverConfig, PushoverNotifier};

/// Environment override for the file digest algorithm
pub const HASH_ALGORITHM_ENV: &str = "MTGJSON5_HASH_ALGORITHM";

/// Configuration for every utility collaborator
#[derive(Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub pushover: PushoverConfig,
    pub hashing: FileHasher,
    /// Version reported in notifications
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            http: HttpConfig::default(),
            pushover: PushoverConfig::default(),
            hashing: FileHasher::default(),
            version: crate::VERSION.to_string(),
        }
    }
}

impl Config {
    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// An unknown hash algorithm name is rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hashing = match lookup(HASH_ALGORITHM_ENV) {
            Some(name) => FileHasher::new(name.trim().parse()?),
            None => FileHasher::default(),
        };

        Ok(Self {
            logging: LoggingConfig::from_lookup(&lookup),
            http: HttpConfig::from_lookup(&lookup),
            pushover: PushoverConfig::from_lookup(&lookup),
            hashing,
            ..Self::default()
        })
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_pushover(mut self, pushover: PushoverConfig) -> Self {
        self.pushover = pushover;
        self
    }

    pub const fn with_hashing(mut self, hashing: FileHasher) -> Self {
        self.hashing = hashing;
        self
    }

    /// Set the version; the notification title follows it
    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = version.into();
        self.pushover = self.pushover.with_version(&self.version);
        self
    }

    /// Session factory for this configuration
    pub fn session_factory(&self) -> SessionFactory {
        SessionFactory::new(self.http.clone())
    }

    /// Pushover notifier sharing this configuration's HTTP settings
    pub fn notifier(&self) -> Result<PushoverNotifier> {
        let session = self.session_factory().session(None)?;
        Ok(PushoverNotifier::with_session(self.pushover.clone(), session))
    }
}
