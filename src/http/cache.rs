//! On-disk response cache
//!
//! Each namespace (usually the name of the data provider) gets its own
//! directory. A response is stored as one JSON file named after the SHA-256
//! of its URL, with the body base64 encoded.

use super::HttpResponse;
use crate::error::{Result, UtilError};
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Serialize, Deserialize)]
struct CachedEntry {
    url: String,
    status: u16,
    body: String,
    stored_at: DateTime<Utc>,
}

/// Response cache rooted at `<cache_dir>/<namespace>`
#[derive(Debug, Clone)]
pub struct ResponseCache {
    root: PathBuf,
}

impl ResponseCache {
    /// Open the cache for `namespace` under `cache_dir`
    ///
    /// The namespace must be a single non-empty path component.
    pub fn new<P: AsRef<Path>>(cache_dir: P, namespace: &str) -> Result<Self> {
        let valid = !namespace.is_empty()
            && namespace != "."
            && namespace != ".."
            && !namespace.contains(['/', '\\']);
        if !valid {
            return Err(UtilError::invalid_config(format!("invalid cache namespace '{namespace}'")));
        }

        Ok(Self {
            root: cache_dir.as_ref().join(namespace),
        })
    }

    /// Directory holding this namespace's entries
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let key = hex::encode(Sha256::digest(url.as_bytes()));
        self.root.join(format!("{key}.json"))
    }

    /// Cached response for `url`, if any
    ///
    /// Unreadable or corrupt entries are treated as missing.
    pub async fn load(&self, url: &str) -> Result<Option<HttpResponse>> {
        let path = self.entry_path(url);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(UtilError::Cache(format!("{}: {e}", path.display()))),
        };

        let decoded = serde_json::from_slice::<CachedEntry>(&raw)
            .map_err(|e| e.to_string())
            .and_then(|entry| {
                general_purpose::STANDARD
                    .decode(&entry.body)
                    .map(|body| (entry, body))
                    .map_err(|e| e.to_string())
            });

        match decoded {
            Ok((entry, body)) => {
                debug!("Cache hit for {} (stored {})", url, entry.stored_at);
                Ok(Some(HttpResponse {
                    url: entry.url,
                    status: entry.status,
                    body: Bytes::from(body),
                    from_cache: true,
                }))
            }
            Err(reason) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), reason);
                Ok(None)
            }
        }
    }

    /// Store `response` under the URL it was requested with
    pub async fn store(&self, url: &str, response: &HttpResponse) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| UtilError::Cache(format!("{}: {e}", self.root.display())))?;

        let entry = CachedEntry {
            url: response.url.clone(),
            status: response.status,
            body: general_purpose::STANDARD.encode(&response.body),
            stored_at: Utc::now(),
        };
        let path = self.entry_path(url);
        // One staging file per writer; concurrent stores of a URL each rename their own
        let staging = path.with_extension(format!("{:016x}.tmp", rand::random::<u64>()));

        if let Err(e) = tokio::fs::write(&staging, serde_json::to_vec(&entry)?).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(UtilError::Cache(format!("{}: {e}", staging.display())));
        }
        if let Err(e) = tokio::fs::rename(&staging, &path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(UtilError::Cache(format!("{}: {e}", path.display())));
        }

        Ok(())
    }

    /// Remove every entry of this namespace
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(UtilError::Cache(format!("{}: {e}", self.root.display())))
            }
            _ => Ok(()),
        }
    }
}
