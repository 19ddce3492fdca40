//! File content hashing
//!
//! Output files ship with a checksum next to them. [`FileHasher`] streams a
//! file through the configured digest in fixed-size blocks, so large
//! compiled outputs never have to fit in memory.

use crate::error::{Result, UtilError};
use serde::{Deserialize, Serialize};
use sha2::digest::DynDigest;
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Default read block size in bytes
pub const DEFAULT_BLOCK_SIZE: usize = 65_536;

/// Supported digest algorithms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
    #[serde(rename = "sha3_256")]
    Sha3_256,
    #[serde(rename = "sha3_512")]
    Sha3_512,
}

impl HashAlgorithm {
    /// Fresh hasher state for this algorithm
    fn hasher(self) -> Box<dyn DynDigest + Send> {
        match self {
            Self::Sha256 => Box::new(sha2::Sha256::default()),
            Self::Sha384 => Box::new(sha2::Sha384::default()),
            Self::Sha512 => Box::new(sha2::Sha512::default()),
            Self::Sha3_256 => Box::new(sha3::Sha3_256::default()),
            Self::Sha3_512 => Box::new(sha3::Sha3_512::default()),
        }
    }

    /// Conventional name, also used as the checksum file extension
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
            Self::Sha3_256 => "sha3_256",
            Self::Sha3_512 => "sha3_512",
        }
    }

    /// Length of the hex digest
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Sha256 | Self::Sha3_256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 | Self::Sha3_512 => 128,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = UtilError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            "sha3_256" => Ok(Self::Sha3_256),
            "sha3_512" => Ok(Self::Sha3_512),
            other => Err(UtilError::invalid_config(format!("unknown hash algorithm '{other}'"))),
        }
    }
}

/// Streams files through a digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHasher {
    pub algorithm: HashAlgorithm,
    pub block_size: usize,
}

impl Default for FileHasher {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl FileHasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Set the read block size; zero is raised to one byte
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    /// Hex digest of the file at `path`
    ///
    /// A path that is not a regular file is not an error: a warning is
    /// logged and an empty string returned. Read failures on an existing
    /// file are propagated.
    pub fn hash_file<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        if !path.is_file() {
            warn!("Unable to find {}, no hashes generated", path.display());
            return Ok(String::new());
        }

        let mut file = File::open(path)?;
        let mut hasher = self.algorithm.hasher();
        let mut buffer = vec![0_u8; self.block_size.max(1)];

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(read) => read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buffer[..read]);
        }

        let digest = hex::encode(hasher.finalize());
        debug!("{} of {}: {}", self.algorithm, path.display(), digest);
        Ok(digest)
    }

    /// Hex digest of an in-memory buffer
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        let mut hasher = self.algorithm.hasher();
        hasher.update(data);
        hex::encode(hasher.finalize())
    }
}

/// SHA-256 of a file with the default block size
pub fn get_file_hash<P: AsRef<Path>>(path: P) -> Result<String> {
    FileHasher::default().hash_file(path)
}
