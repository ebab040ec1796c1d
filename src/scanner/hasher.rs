//! Bounded-prefix content hashing.
//!
//! Only the first `prefix_limit` bytes of each file are read (1 MiB by
//! default), so two files that differ only past the prefix hash equal.
//! Files that cannot be read get a hash over their path and size instead,
//! tagged with [`FALLBACK_PREFIX`] so it can never equal a content digest.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use super::{Candidate, FileRecord};

/// Default number of leading bytes that are hashed.
pub const DEFAULT_PREFIX_LIMIT: u64 = 1 << 20;

/// Marker prefix for metadata-derived hashes.
pub const FALLBACK_PREFIX: &str = "meta:";

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Digest used for content hashes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// BLAKE3 (64 hex chars)
    #[default]
    Blake3,
    /// SHA-256 (64 hex chars)
    Sha256,
    /// SHA-1 (40 hex chars)
    Sha1,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3 => write!(f, "blake3"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha1 => write!(f, "sha1"),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blake3" => Ok(Self::Blake3),
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            other => Err(format!("unknown hash algorithm: {other}")),
        }
    }
}

/// Running state of one of the supported digests.
enum Engine {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
    Sha1(Sha1),
}

impl Engine {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Sha256 => Self::Sha256(Sha256::new()),
            HashAlgorithm::Sha1 => Self::Sha1(Sha1::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
        }
    }

    fn finish_hex(self) -> String {
        match self {
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
            Self::Sha256(h) => format!("{:x}", h.finalize()),
            Self::Sha1(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// Computes content hashes for scan candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
    prefix_limit: u64,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl ContentHasher {
    /// Create a hasher reading the default prefix.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            prefix_limit: DEFAULT_PREFIX_LIMIT,
        }
    }

    /// Set how many leading bytes are hashed. `0` is treated as 1.
    #[must_use]
    pub fn with_prefix_limit(mut self, limit: u64) -> Self {
        self.prefix_limit = limit.max(1);
        self
    }

    /// The configured algorithm.
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The configured prefix length.
    #[must_use]
    pub fn prefix_limit(&self) -> u64 {
        self.prefix_limit
    }

    /// Hash the content prefix of `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be opened or read.
    pub fn try_hash(&self, path: &Path) -> io::Result<String> {
        let file = File::open(path)?;
        let mut reader = file.take(self.prefix_limit);
        let mut engine = Engine::new(self.algorithm);
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            engine.update(&buffer[..n]);
        }

        Ok(engine.finish_hex())
    }

    /// Hash over a domain-separated `path|size` string.
    #[must_use]
    pub fn fallback_hash(&self, path: &Path, size: u64) -> String {
        let mut engine = Engine::new(self.algorithm);
        engine.update(b"fallback\0");
        engine.update(format!("{}|{}", path.display(), size).as_bytes());
        format!("{FALLBACK_PREFIX}{}", engine.finish_hex())
    }

    /// Hash `path`, falling back to metadata if it cannot be read.
    #[must_use]
    pub fn hash_file(&self, path: &Path, size: u64) -> String {
        match self.try_hash(path) {
            Ok(hash) => hash,
            Err(e) => {
                log::debug!(
                    "Hashing {} failed ({}), using metadata fallback",
                    path.display(),
                    e
                );
                self.fallback_hash(path, size)
            }
        }
    }

    /// Turn a walked candidate into a hashed record.
    #[must_use]
    pub fn record(&self, candidate: Candidate) -> FileRecord {
        let hash = self.hash_file(&candidate.path, candidate.size);
        FileRecord::new(candidate.path, candidate.size, candidate.modified, hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();

        let sha256 = ContentHasher::new(HashAlgorithm::Sha256)
            .try_hash(&path)
            .unwrap();
        assert_eq!(
            sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        let sha1 = ContentHasher::new(HashAlgorithm::Sha1)
            .try_hash(&path)
            .unwrap();
        assert_eq!(sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");

        let blake = ContentHasher::new(HashAlgorithm::Blake3)
            .try_hash(&path)
            .unwrap();
        assert_eq!(blake, blake3::hash(b"abc").to_hex().to_string());
    }

    #[test]
    fn test_prefix_limit_collides_past_prefix() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        fs::write(&a, b"same-prefix-AAAA").unwrap();
        fs::write(&b, b"same-prefix-BBBB").unwrap();

        let hasher = ContentHasher::default().with_prefix_limit(11);
        assert_eq!(hasher.try_hash(&a).unwrap(), hasher.try_hash(&b).unwrap());

        let full = ContentHasher::default();
        assert_ne!(full.try_hash(&a).unwrap(), full.try_hash(&b).unwrap());
    }

    #[test]
    fn test_empty_file_hashes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();
        let hash = ContentHasher::default().hash_file(&path, 0);
        assert!(!hash.starts_with(FALLBACK_PREFIX));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_fallback_for_unreadable_file() {
        let hasher = ContentHasher::default();
        let missing = Path::new("/nonexistent/dupesweep/file.bin");
        let hash = hasher.hash_file(missing, 42);
        assert!(hash.starts_with(FALLBACK_PREFIX));
        assert_eq!(hash, hasher.fallback_hash(missing, 42));
        assert_ne!(hash, hasher.fallback_hash(missing, 43));
    }

    #[test]
    fn test_algorithm_parse_and_display() {
        assert_eq!("SHA256".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha256));
        assert_eq!("sha-1".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha1));
        assert!("md5".parse::<HashAlgorithm>().is_err());
        assert_eq!(HashAlgorithm::Blake3.to_string(), "blake3");
    }
}
