/// Fatal errors for a single analysis request
///
/// Field-level problems (undecodable images, missing or corrupt GPS tags) are
/// reported in-band on the `MetadataRecord`. Only failures that make the
/// digests untrustworthy surface here.
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("source truncated: expected {expected} bytes, read {read}")]
    Truncated { expected: u64, read: u64 },

    #[error("source changed during digest: expected {expected} bytes, read {read}")]
    LengthMismatch { expected: u64, read: u64 },

    #[error("digest cancelled after {processed} bytes")]
    Cancelled { processed: u64 },

    #[error("digest timed out after {processed} bytes")]
    TimedOut { processed: u64 },

    #[error("source views disagree on length: {metadata} vs {digest} bytes")]
    InconsistentViews { metadata: u64, digest: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
