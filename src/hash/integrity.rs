//! Streaming file digests
//!
//! The comparator only needs to know whether two files of equal length hold
//! the same bytes, so everything here reduces to "digest a file" and
//! "digest two files and compare".

use crate::config::HashAlgorithm;
use crate::error::{IoResultExt, Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Digest of a file as a lowercase hex string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashResult {
    /// The hash algorithm used
    pub algorithm: HashAlgorithm,
    /// Hash value as lowercase hex string
    pub hash: String,
    /// Number of bytes digested
    pub size: u64,
}

impl HashResult {
    /// Create a new hash result
    pub fn new(algorithm: HashAlgorithm, hash: String, size: u64) -> Self {
        Self { algorithm, hash, size }
    }

    /// Two results match when they use the same algorithm and digest
    pub fn matches(&self, other: &HashResult) -> bool {
        self.algorithm == other.algorithm && self.size == other.size && self.hash == other.hash
    }
}

impl std::fmt::Display for HashResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Unified hasher over every supported algorithm
pub enum Hasher {
    /// XXHash3 128-bit
    XXHash3(xxhash_rust::xxh3::Xxh3),
    /// XXHash64
    XXHash64(xxhash_rust::xxh64::Xxh64),
    /// BLAKE3
    Blake3(blake3::Hasher),
    /// SHA-256
    Sha256(sha2::Sha256),
}

impl Hasher {
    /// Create a new hasher for the given algorithm
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::XXHash3 => Self::XXHash3(xxhash_rust::xxh3::Xxh3::new()),
            HashAlgorithm::XXHash64 => Self::XXHash64(xxhash_rust::xxh64::Xxh64::new(0)),
            HashAlgorithm::Blake3 => Self::Blake3(blake3::Hasher::new()),
            HashAlgorithm::Sha256 => {
                use sha2::Digest;
                Self::Sha256(sha2::Sha256::new())
            }
        }
    }

    /// Feed more data
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::XXHash3(h) => h.update(data),
            Self::XXHash64(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => {
                use sha2::Digest;
                h.update(data);
            }
        }
    }

    /// Finalize and get the hash as hex string
    pub fn finalize(self) -> String {
        match self {
            Self::XXHash3(h) => format!("{:032x}", h.digest128()),
            Self::XXHash64(h) => format!("{:016x}", h.digest()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
            Self::Sha256(h) => {
                use sha2::Digest;
                hex::encode(h.finalize())
            }
        }
    }
}

/// Compute the digest of a file
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> Result<HashResult> {
    let mut reader = File::open(path).with_path(path)?;
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut size = 0u64;

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(SyncError::io(path, e)),
        };

        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(HashResult::new(algorithm, hasher.finalize(), size))
}

/// Compute the digest of data in memory
pub fn hash_bytes(data: &[u8], algorithm: HashAlgorithm) -> HashResult {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    HashResult::new(algorithm, hasher.finalize(), data.len() as u64)
}

/// Result of comparing two files by digest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Digest of the source file
    pub source_hash: HashResult,
    /// Digest of the destination file
    pub dest_hash: HashResult,
    /// Whether the digests match
    pub matches: bool,
}

/// Digest two files and compare them
pub fn verify_files_match(
    source: &Path,
    dest: &Path,
    algorithm: HashAlgorithm,
) -> Result<VerificationResult> {
    let source_hash = hash_file(source, algorithm)?;
    let dest_hash = hash_file(dest, algorithm)?;
    let matches = source_hash.matches(&dest_hash);

    Ok(VerificationResult {
        source_hash,
        dest_hash,
        matches,
    })
}

/// Check whether two files hold identical bytes
pub fn contents_match(source: &Path, dest: &Path, algorithm: HashAlgorithm) -> Result<bool> {
    Ok(verify_files_match(source, dest, algorithm)?.matches)
}
