//! Retrying HTTP sessions
//!
//! Data providers talk to their upstream APIs through a [`RetryableSession`]
//! handed out by a [`SessionFactory`]. A session:
//!
//! - identifies itself with a fixed User-Agent,
//! - retries transient failures (connection errors, timeouts, HTTP 500,
//!   502 and 504) with exponential backoff,
//! - optionally serves GET requests from an on-disk cache, one directory per
//!   namespace chosen by the caller. A failed cache write is logged and the
//!   fetched response is still returned.
//!
//! # Example
//!
//! ```rust,no_run
//! use mtgjson_util::http::{HttpConfig, SessionFactory};
//!
//! # async fn run() -> mtgjson_util::Result<()> {
//! let factory = SessionFactory::new(HttpConfig::from_env());
//! let session = factory.session(Some("ScryfallProvider"))?;
//! let sets: serde_json::Value = session.get("https://api.scryfall.com/sets").await?.json()?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod retry_policy;

pub use cache::ResponseCache;
pub use retry_policy::{RetryCondition, RetryExecutor, RetryPolicy, DEFAULT_STATUS_FORCELIST};

use crate::error::{Result, UtilError};
use crate::logging::is_truthy;
use bytes::Bytes;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// User-Agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 Firefox/75.0 www.mtgjson.com";

/// Environment flag enabling the response cache
pub const USE_CACHE_ENV: &str = "MTGJSON5_CACHE";
/// Environment override for the cache directory
pub const CACHE_DIR_ENV: &str = "MTGJSON5_CACHE_DIR";

/// Configuration shared by every session of a factory
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User-Agent header value
    pub user_agent: String,
    /// Retry behaviour
    pub retry_policy: RetryPolicy,
    /// Connection timeout for new connections
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// Serve and store GET responses on disk
    pub use_cache: bool,
    /// Root directory of the response cache
    pub cache_dir: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_policy: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            use_cache: false,
            cache_dir: PathBuf::from(".mtgjson5_cache"),
        }
    }
}

impl HttpConfig {
    /// Read the cache settings from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the cache settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            use_cache: lookup(USE_CACHE_ENV).is_some_and(|value| is_truthy(&value)),
            cache_dir: lookup(CACHE_DIR_ENV).map_or(defaults.cache_dir.clone(), PathBuf::from),
            ..defaults
        }
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry_policy.max_retries = max_retries;
        self
    }

    pub fn with_cache<P: Into<PathBuf>>(mut self, cache_dir: P) -> Self {
        self.use_cache = true;
        self.cache_dir = cache_dir.into();
        self
    }

    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Bytes,
    /// Served from the on-disk cache
    pub from_cache: bool,
}

impl HttpResponse {
    /// 2xx status
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body decoded as UTF-8
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| UtilError::Serialization(e.to_string()))
    }

    /// Body parsed as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-2xx status into an error
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(UtilError::HttpStatus {
                status: self.status,
                url: self.url,
            })
        }
    }
}

/// Hands out configured [`RetryableSession`]s
#[derive(Debug, Clone, Default)]
pub struct SessionFactory {
    config: HttpConfig,
}

impl SessionFactory {
    pub const fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Build a session; `namespace` selects the cache directory
    ///
    /// Without a namespace, or with caching disabled, the session always
    /// goes to the network.
    pub fn session(&self, namespace: Option<&str>) -> Result<RetryableSession> {
        let client = Client::builder()
            .user_agent(&self.config.user_agent)
            .connect_timeout(self.config.connect_timeout)
            .timeout(self.config.request_timeout)
            .build()
            .map_err(|e| UtilError::invalid_config(format!("Failed to create HTTP client: {e}")))?;

        let cache = match namespace {
            Some(namespace) if self.config.use_cache => {
                let cache = ResponseCache::new(&self.config.cache_dir, namespace)?;
                info!("Caching responses for {} under {}", namespace, cache.root().display());
                Some(cache)
            }
            _ => None,
        };

        Ok(RetryableSession {
            client,
            policy: self.config.retry_policy.clone(),
            cache,
        })
    }
}

/// Build a single session from `config`
pub fn retryable_session(config: &HttpConfig, namespace: Option<&str>) -> Result<RetryableSession> {
    SessionFactory::new(config.clone()).session(namespace)
}

/// HTTP client with retries and an optional response cache
#[derive(Debug, Clone)]
pub struct RetryableSession {
    client: Client,
    policy: RetryPolicy,
    cache: Option<ResponseCache>,
}

impl RetryableSession {
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub const fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// GET `url`
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.get_url(parse_url(url)?).await
    }

    /// GET `url` with query parameters appended
    pub async fn get_with_params<K, V>(&self, url: &str, params: &[(K, V)]) -> Result<HttpResponse>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let url = Url::parse_with_params(url, params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
            .map_err(|e| UtilError::InvalidUrl(format!("{url}: {e}")))?;
        self.get_url(url).await
    }

    async fn get_url(&self, url: Url) -> Result<HttpResponse> {
        let key = url.as_str().to_string();

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.load(&key).await? {
                return Ok(cached);
            }
        }

        let response = self
            .policy
            .executor()
            .execute(|| self.fetch(url.clone()))
            .await?;

        if let Some(cache) = &self.cache {
            if response.is_success() {
                if let Err(e) = cache.store(&key, &response).await {
                    warn!("Failed to cache {}: {}", key, e);
                }
            }
        }

        Ok(response)
    }

    /// One GET attempt; retryable statuses come back as errors
    async fn fetch(&self, url: Url) -> Result<HttpResponse> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status().as_u16();

        if self.policy.should_retry_status(status) {
            return Err(UtilError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            url: final_url,
            status,
            body,
            from_cache: false,
        })
    }

    /// POST a form once, without retries or caching
    pub async fn post_form<T: serde::Serialize + ?Sized>(&self, url: &str, form: &T) -> Result<HttpResponse> {
        let url = parse_url(url)?;
        debug!("POST {}", url);

        let response = self.client.post(url).form(form).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.bytes().await?;

        Ok(HttpResponse {
            url: final_url,
            status,
            body,
            from_cache: false,
        })
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| UtilError::InvalidUrl(format!("{url}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.retry_policy.max_retries, 8);
        assert!(!config.use_cache);
    }

    #[test]
    fn test_config_from_lookup() {
        let env: HashMap<&str, &str> = [(USE_CACHE_ENV, "1"), (CACHE_DIR_ENV, "/tmp/mtgjson-cache")].into();
        let config = HttpConfig::from_lookup(|key| env.get(key).map(|v| (*v).to_string()));
        assert!(config.use_cache);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/mtgjson-cache"));
    }

    #[test]
    fn test_cache_requires_namespace_and_flag() {
        let dir = tempfile::tempdir().unwrap();

        let uncached = SessionFactory::new(HttpConfig::default()).session(Some("Provider")).unwrap();
        assert!(uncached.cache().is_none());

        let factory = SessionFactory::new(HttpConfig::default().with_cache(dir.path()));
        assert!(factory.session(None).unwrap().cache().is_none());

        let cached = factory.session(Some("Provider")).unwrap();
        assert_eq!(cached.cache().unwrap().root(), dir.path().join("Provider"));
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse {
            url: "https://example.com".to_string(),
            status: 404,
            body: Bytes::from_static(br#"{"error": "missing"}"#),
            from_cache: false,
        };

        assert!(!response.is_success());
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(body["error"], "missing");
        assert_eq!(response.error_for_status().unwrap_err().status(), Some(404));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let session = SessionFactory::default().session(None).unwrap();
        let err = session.get("not a url").await.unwrap_err();
        assert!(matches!(err, UtilError::InvalidUrl(_)));
    }
}
