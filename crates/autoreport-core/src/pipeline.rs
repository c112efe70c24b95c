/// One request: one upload in, metadata + hashes (and a report) out
use serde::Serialize;
use std::io;
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::forensics::{CancelFlag, DigestEngine, DigestProgress, HashRecord};
use crate::metadata::{extract_metadata, MetadataRecord};
use crate::report::{synthesize, Report, ReportTemplate};
use crate::source::{ByteSource, FileDescriptor, Upload};

/// Metadata and hashes computed from the same bytes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub metadata: MetadataRecord,
    pub hashes: HashRecord,
}

impl Analysis {
    pub fn report(&self, template: &ReportTemplate) -> Report {
        synthesize(&self.metadata, &self.hashes, template)
    }
}

type ProgressCallback = Arc<dyn Fn(DigestProgress) + Send + Sync>;

/// Runs the extraction and digest stages for each request
#[derive(Default)]
pub struct Analyzer {
    config: AnalysisConfig,
    cancel: Option<CancelFlag>,
    progress_callback: Option<ProgressCallback>,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
            progress_callback: None,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(DigestProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
    }

    /// Header template for the configured language
    pub fn template(&self) -> ReportTemplate {
        ReportTemplate::for_language(self.config.language)
    }

    fn digest_engine(&self) -> DigestEngine {
        let mut engine = DigestEngine::from_config(&self.config);
        if let Some(flag) = &self.cancel {
            engine = engine.with_cancel_flag(flag.clone());
        }
        if let Some(callback) = &self.progress_callback {
            let callback = Arc::clone(callback);
            engine.set_progress_callback(move |progress| callback(progress));
        }
        engine
    }

    /// Sequential analysis on a single source: extract, rewind, digest.
    pub fn analyze<S: ByteSource>(&self, upload: &mut Upload<S>) -> Result<Analysis> {
        let file = upload.descriptor().clone();
        tracing::info!(
            "Analyzing {} ({}, {} bytes)",
            file.name,
            file.content_type,
            file.size_bytes
        );

        let source = upload.source_mut();
        let metadata = extract_metadata(file.clone(), source, &self.config)?;
        let hashes = self.digest_engine().digest(source)?;

        let digested = source.length()?;
        if digested != file.size_bytes {
            return Err(AnalysisError::InconsistentViews {
                metadata: file.size_bytes,
                digest: digested,
            });
        }

        tracing::info!("Analysis of {} complete (SHA256 {})", file.name, hashes.sha256);
        Ok(Analysis { metadata, hashes })
    }

    /// Parallel analysis: `open` must yield independent views of the same
    /// bytes; extraction and digesting each get their own.
    pub fn analyze_parallel<S, F>(
        &self,
        name: &str,
        content_type: &str,
        open: F,
    ) -> Result<Analysis>
    where
        S: ByteSource,
        F: Fn() -> io::Result<S> + Sync,
    {
        tracing::info!("Analyzing {} ({}) with independent views", name, content_type);
        let engine = self.digest_engine();

        let (metadata, digest) = rayon::join(
            || -> Result<MetadataRecord> {
                let mut view = open()?;
                let file = FileDescriptor {
                    name: name.to_string(),
                    content_type: content_type.to_string(),
                    size_bytes: view.length()?,
                };
                extract_metadata(file, &mut view, &self.config)
            },
            || -> Result<(HashRecord, u64)> {
                let mut view = open()?;
                let length = view.length()?;
                Ok((engine.digest(&mut view)?, length))
            },
        );

        let metadata = metadata?;
        let (hashes, digested) = digest?;
        if metadata.file.size_bytes != digested {
            return Err(AnalysisError::InconsistentViews {
                metadata: metadata.file.size_bytes,
                digest: digested,
            });
        }

        tracing::info!("Analysis of {} complete (SHA256 {})", name, hashes.sha256);
        Ok(Analysis { metadata, hashes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_sequential_and_parallel_agree() {
        let bytes: Arc<[u8]> = Arc::from(&b"chain of custody"[..]);
        let analyzer = Analyzer::default();

        let mut upload = Upload::from_bytes("note.txt", "text/plain", Arc::clone(&bytes));
        let sequential = analyzer.analyze(&mut upload).unwrap();
        let parallel = analyzer
            .analyze_parallel("note.txt", "text/plain", || {
                Ok(Cursor::new(Arc::clone(&bytes)))
            })
            .unwrap();

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_views_of_different_length_rejected() {
        let analyzer = Analyzer::default();
        let calls = std::sync::atomic::AtomicUsize::new(0);

        let result = analyzer.analyze_parallel("a.bin", "application/octet-stream", || {
            let n = calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Cursor::new(vec![0u8; 10 + n]))
        });

        assert!(matches!(result, Err(AnalysisError::InconsistentViews { .. })));
    }

    #[test]
    fn test_cancelled_analysis_fails_whole_request() {
        let flag = CancelFlag::new();
        flag.cancel();
        let analyzer = Analyzer::default().with_cancel_flag(flag);
        let mut upload = Upload::from_bytes("a.bin", "application/octet-stream", vec![1u8; 64]);

        assert!(matches!(
            analyzer.analyze(&mut upload),
            Err(AnalysisError::Cancelled { .. })
        ));
        assert_eq!(upload.source_mut().position(), 0);
    }

    #[test]
    fn test_template_follows_configured_language() {
        let config = AnalysisConfig {
            language: crate::config::ReportLanguage::Portuguese,
            ..Default::default()
        };
        let analyzer = Analyzer::new(config.clone()).unwrap();

        assert_eq!(analyzer.config(), &config);
        assert_eq!(analyzer.template(), ReportTemplate::portuguese());
        assert_eq!(Analyzer::default().template(), ReportTemplate::english());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(Analyzer::new(config).is_err());
    }
}
