/// Multi-digest hashing for forensic identity
///
/// The engine streams the source once, in bounded chunks, through MD5, SHA1
/// and SHA256 at the same time. A digest is only reported when every byte
/// of the declared length was read; the source is left rewound on every exit.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{AnalysisConfig, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::error::{AnalysisError, Result};
use crate::source::ByteSource;

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    MD5,
    SHA1,
    SHA256,
}

impl HashAlgorithm {
    /// All algorithms, in report order
    pub fn all() -> [Self; 3] {
        [Self::MD5, Self::SHA1, Self::SHA256]
    }

    /// Get algorithm name
    pub fn name(&self) -> &'static str {
        match self {
            Self::MD5 => "MD5",
            Self::SHA1 => "SHA1",
            Self::SHA256 => "SHA256",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "MD5" => Ok(Self::MD5),
            "SHA1" => Ok(Self::SHA1),
            "SHA256" => Ok(Self::SHA256),
            other => Err(format!("unsupported hash algorithm: {}", other)),
        }
    }
}

/// Lowercase hex digests of one byte sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    #[serde(rename = "MD5")]
    pub md5: String,
    #[serde(rename = "SHA1")]
    pub sha1: String,
    #[serde(rename = "SHA256")]
    pub sha256: String,
}

impl HashRecord {
    pub fn get(&self, algorithm: HashAlgorithm) -> &str {
        match algorithm {
            HashAlgorithm::MD5 => &self.md5,
            HashAlgorithm::SHA1 => &self.sha1,
            HashAlgorithm::SHA256 => &self.sha256,
        }
    }

    /// (algorithm, digest) pairs in report order
    pub fn entries(&self) -> [(HashAlgorithm, &str); 3] {
        HashAlgorithm::all().map(|algorithm| (algorithm, self.get(algorithm)))
    }

    /// Compare against a reference digest (case-insensitive, surrounding whitespace ignored)
    pub fn verify(&self, algorithm: HashAlgorithm, expected: &str) -> HashVerification {
        let actual = self.get(algorithm).to_string();
        let expected = expected.trim().to_string();
        let status = if actual.eq_ignore_ascii_case(&expected) {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Mismatch
        };

        HashVerification {
            algorithm,
            expected,
            actual,
            status,
        }
    }
}

/// Hash verification result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashVerification {
    pub algorithm: HashAlgorithm,
    pub expected: String,
    pub actual: String,
    pub status: VerificationStatus,
}

/// Verification status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Hash matches expected value
    Verified,
    /// Hash does not match (content differs from the reference)
    Mismatch,
}

/// Shared flag a caller flips to abort a running digest
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DigestProgress {
    pub bytes_processed: u64,
    pub total_bytes: u64,
}

/// Chunked MD5 + SHA1 + SHA256 engine
pub struct DigestEngine {
    chunk_size: usize,
    timeout: Option<Duration>,
    cancel: Option<CancelFlag>,
    progress_callback: Option<Box<dyn Fn(DigestProgress) + Send + Sync>>,
}

impl Default for DigestEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl DigestEngine {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE),
            timeout: None,
            cancel: None,
            progress_callback: None,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        let mut engine = Self::new(config.effective_chunk_size());
        engine.timeout = config.timeout();
        engine
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(DigestProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Digest the whole source from offset 0.
    pub fn digest<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<HashRecord> {
        let expected = source.length()?;
        source.seek_to(0)?;

        let outcome = self.stream(source, expected);

        // Leave the source usable for the next reader whatever happened.
        match (outcome, source.seek_to(0)) {
            (Ok(record), Ok(())) => Ok(record),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e.into()),
        }
    }

    fn stream<S: ByteSource + ?Sized>(&self, source: &mut S, expected: u64) -> Result<HashRecord> {
        let started = Instant::now();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut md5 = md5::Context::new();
        let mut sha1 = sha1::Sha1::new();
        let mut sha256 = Sha256::new();
        let mut processed = 0u64;

        loop {
            if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                tracing::warn!("Digest cancelled after {} of {} bytes", processed, expected);
                return Err(AnalysisError::Cancelled { processed });
            }
            if self.timeout.is_some_and(|limit| started.elapsed() > limit) {
                tracing::warn!("Digest timed out after {} of {} bytes", processed, expected);
                return Err(AnalysisError::TimedOut { processed });
            }

            let n = source.read_chunk(&mut buffer)?;
            if n == 0 {
                break;
            }

            let chunk = &buffer[..n];
            md5.consume(chunk);
            sha1.update(chunk);
            sha256.update(chunk);
            processed += n as u64;

            if let Some(callback) = &self.progress_callback {
                callback(DigestProgress {
                    bytes_processed: processed,
                    total_bytes: expected,
                });
            }
        }

        if processed < expected {
            return Err(AnalysisError::Truncated {
                expected,
                read: processed,
            });
        }
        if processed > expected {
            return Err(AnalysisError::LengthMismatch {
                expected,
                read: processed,
            });
        }

        tracing::debug!(
            "Digested {} bytes in {:?} ({} byte chunks)",
            processed,
            started.elapsed(),
            self.chunk_size
        );

        Ok(HashRecord {
            md5: format!("{:x}", md5.compute()),
            sha1: format!("{:x}", sha1.finalize()),
            sha256: format!("{:x}", sha256.finalize()),
        })
    }
}
