//! Artifact identity: path plus content digest.

use sha2::{Digest, Sha256};
use std::path::Path;

/// A file or workspace path under analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: String,
    pub content_hash: String,
}

impl Artifact {
    /// Build an artifact from a file on disk, hashing its contents.
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_string_lossy().to_string(),
            content_hash: hash_bytes(&bytes),
        })
    }
}

/// Hex SHA-256 digest of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
