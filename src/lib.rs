//! MTGJSON utility layer
//!
//! Helpers shared by the card-data build pipeline: bounded parallel calls,
//! deterministic sorting of nested JSON, retrying HTTP sessions with an
//! optional on-disk cache, file checksums, Pushover notifications and a
//! handful of string and naming utilities.
//!
//! # Features
//!
//! - **Parallel calls**: at most `pool_size` calls in flight, results in input order
//! - **Deterministic sorting**: every array in a nested value sorted, object key order kept
//! - **HTTP sessions**: fixed User-Agent, exponential backoff, namespaced response cache
//! - **Checksums**: streaming SHA-2/SHA-3 file digests
//! - **Notifications**: Pushover messages to every configured user
//!
//! # Quick Start
//!
//! ```rust
//! use mtgjson_util::{parallel_call, sort_internal_lists, ParallelOptions};
//! use serde_json::{json, Value};
//!
//! #[tokio::main]
//! async fn main() -> mtgjson_util::Result<()> {
//!     let squares = parallel_call(
//!         |n: u64| async move { Ok(json!(n * n)) },
//!         vec![3, 1, 2],
//!         ParallelOptions::new().with_pool_size(2),
//!     )
//!     .await?;
//!     assert_eq!(squares, json!([9, 1, 4]));
//!
//!     let sorted = sort_internal_lists(json!({"colors": ["W", "B", "U"]}))?;
//!     assert_eq!(sorted, json!({"colors": ["B", "U", "W"]}));
//!     Ok(())
//! }
//! ```

/// Crate version constant
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Core modules
pub mod error;
pub mod parallel;
pub mod sort;

// I/O collaborators
pub mod hashing;
pub mod http;
pub mod notify;

// Ambient modules
pub mod config;
pub mod logging;

// Utility modules
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{Result, UtilError};
pub use hashing::{get_file_hash, FileHasher, HashAlgorithm};
pub use http::{retryable_session, HttpConfig, HttpResponse, RetryPolicy, RetryableSession, SessionFactory};
pub use logging::{init_logger, LoggingConfig};
pub use notify::{PushoverConfig, PushoverNotifier};
pub use parallel::{
    parallel_call, parallel_call_with, BoundedMapper, Fold, ParallelInvoker, ParallelOptions,
    ResultCollection, SpawnMapper, Starmap, StreamMapper, DEFAULT_POOL_SIZE,
};
pub use sort::{compare_values, sort_internal_lists, sort_internal_lists_in_place};
pub use utils::{
    fix_windows_set_name, get_str_or_none, parse_magic_rules_subset, to_camel_case, url_keygen,
    DEFAULT_BAD_FILE_NAMES,
};
