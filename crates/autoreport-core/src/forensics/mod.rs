/// Forensic identity of uploaded content
pub mod digest;

pub use digest::{
    CancelFlag, DigestEngine, DigestProgress, HashAlgorithm, HashRecord, HashVerification,
    VerificationStatus,
};
