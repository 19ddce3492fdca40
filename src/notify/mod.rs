//! Pushover notifications
//!
//! Build status is pushed to every configured Pushover user. Missing
//! credentials are not an error: the sender logs a warning and reports that
//! nothing was delivered.

use crate::error::Result;
use crate::http::{HttpConfig, RetryableSession, SessionFactory};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Pushover messages endpoint
pub const PUSHOVER_ENDPOINT: &str = "https://api.pushover.net/1/messages.json";

/// Environment variable holding the application token
pub const APP_TOKEN_ENV: &str = "MTGJSON5_PUSHOVER_APP_TOKEN";
/// Environment variable holding the comma separated user tokens
pub const USER_TOKENS_ENV: &str = "MTGJSON5_PUSHOVER_USER_TOKENS";

/// Pushover credentials and message settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushoverConfig {
    pub app_token: String,
    pub user_tokens: Vec<String>,
    pub endpoint: String,
    pub title: String,
}

impl Default for PushoverConfig {
    fn default() -> Self {
        Self {
            app_token: String::new(),
            user_tokens: Vec::new(),
            endpoint: PUSHOVER_ENDPOINT.to_string(),
            title: format!("MTGJSON {}", crate::VERSION),
        }
    }
}

impl PushoverConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            app_token: lookup(APP_TOKEN_ENV).unwrap_or_default().trim().to_string(),
            user_tokens: lookup(USER_TOKENS_ENV)
                .map(|tokens| split_tokens(&tokens))
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn with_app_token<S: Into<String>>(mut self, app_token: S) -> Self {
        self.app_token = app_token.into();
        self
    }

    pub fn with_user_tokens<I, S>(mut self, user_tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.user_tokens = user_tokens.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Title `MTGJSON <version>`
    pub fn with_version(mut self, version: &str) -> Self {
        self.title = format!("MTGJSON {version}");
        self
    }

    /// Configured user tokens, blanks removed
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.user_tokens
            .iter()
            .map(|token| token.trim())
            .filter(|token| !token.is_empty())
    }
}

fn split_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Serialize)]
struct PushoverMessage<'a> {
    token: &'a str,
    user: &'a str,
    title: &'a str,
    message: &'a str,
}

/// Sends messages through the Pushover API
#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    config: PushoverConfig,
    session: RetryableSession,
}

impl PushoverNotifier {
    /// Notifier with an uncached default session
    pub fn new(config: PushoverConfig) -> Result<Self> {
        let session = SessionFactory::new(HttpConfig::default()).session(None)?;
        Ok(Self::with_session(config, session))
    }

    pub const fn with_session(config: PushoverConfig, session: RetryableSession) -> Self {
        Self { config, session }
    }

    pub const fn config(&self) -> &PushoverConfig {
        &self.config
    }

    /// Push `message` to every recipient
    ///
    /// Returns `true` only when every recipient accepted the message.
    pub async fn send(&self, message: &str) -> bool {
        if self.config.app_token.trim().is_empty() {
            warn!("Pushover app token not configured, skipping notification");
            return false;
        }

        let recipients: Vec<&str> = self.config.recipients().collect();
        if recipients.is_empty() {
            warn!("No Pushover user tokens configured, skipping notification");
            return false;
        }

        let mut delivered = true;
        for user in recipients {
            let form = PushoverMessage {
                token: self.config.app_token.trim(),
                user,
                title: &self.config.title,
                message,
            };

            match self.session.post_form(&self.config.endpoint, &form).await {
                Ok(response) if response.is_success() => {
                    debug!("Pushover accepted notification");
                }
                Ok(response) => {
                    error!(
                        "Pushover rejected notification ({}): {}",
                        response.status,
                        response.text().unwrap_or_default()
                    );
                    delivered = false;
                }
                Err(e) => {
                    error!("Failed to send Pushover notification: {}", e);
                    delivered = false;
                }
            }
        }

        delivered
    }
}
