use std::path::Path;

pub mod config;
pub mod error;
pub mod forensics;
pub mod metadata;
pub mod pipeline;
pub mod report;
pub mod source;

pub use config::{AnalysisConfig, ReportLanguage};
pub use error::{AnalysisError, Result};
pub use forensics::{
    CancelFlag, DigestEngine, DigestProgress, HashAlgorithm, HashRecord, HashVerification,
    VerificationStatus,
};
pub use metadata::{
    extract_metadata, FormatClass, GpsStatus, ImageAttributes, MetadataRecord, TagDirectory,
};
pub use pipeline::{Analysis, Analyzer};
pub use report::{synthesize, Report, ReportSection, ReportTemplate, SectionKind};
pub use source::{content_type_for_path, ByteSource, FileDescriptor, Upload};

/// Analyze a file on disk. Without an explicit content type the declared type
/// is derived from the file extension.
pub fn analyze_file(
    path: &Path,
    content_type: Option<&str>,
    config: AnalysisConfig,
) -> Result<Analysis> {
    let content_type = content_type.unwrap_or_else(|| content_type_for_path(path));
    let mut upload = Upload::open(path, content_type)?;
    Analyzer::new(config)?.analyze(&mut upload)
}

/// Generate the report text for an analysis with the given header template
pub fn generate_report(analysis: &Analysis, template: &ReportTemplate) -> String {
    analysis.report(template).render()
}
