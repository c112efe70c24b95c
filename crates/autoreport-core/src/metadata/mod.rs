/// Metadata extraction: format classification, image attributes, tag
/// directory and GPS resolution
///
/// Extraction never fails on bad content. A container that cannot be decoded
/// sets `MetadataRecord::error` and the remaining optional fields are left
/// empty; only I/O failures while positioning the source are returned.
pub mod attributes;
pub mod classifier;
pub mod gps;
pub mod tags;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::source::{ByteSource, FileDescriptor};

pub use attributes::{read_attributes, DecodeError, ImageAttributes};
pub use classifier::{classify, mismatch_note, sniff, sniff_source, FileSignature, FormatClass};
pub use gps::{dms_to_decimal, resolve, GpsStatus, GpsTags};
pub use tags::{parse_tags, supports_tag_directory, ParsedTags, TagDirectory, TagError, TagOptions};

/// Everything learned about an upload apart from its digests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataRecord {
    #[serde(flatten)]
    pub file: FileDescriptor,

    pub format_class: FormatClass,

    /// Container attributes, only for decodable images
    pub image: Option<ImageAttributes>,

    /// Embedded tag directory, empty when none was found
    pub exif: TagDirectory,

    /// `None` when GPS was never evaluated (non-image or decode failure)
    pub gps: Option<GpsStatus>,

    /// Set when image decoding was abandoned
    pub error: Option<String>,

    /// Declared type family contradicted by the content signature
    pub type_mismatch: Option<String>,
}

impl MetadataRecord {
    pub fn new(file: FileDescriptor, format_class: FormatClass) -> Self {
        Self {
            file,
            format_class,
            image: None,
            exif: TagDirectory::new(),
            gps: None,
            error: None,
            type_mismatch: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some() || matches!(self.gps, Some(GpsStatus::Malformed { .. }))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Build the metadata record for one upload. The source is left rewound.
pub fn extract_metadata<S: ByteSource + ?Sized>(
    file: FileDescriptor,
    source: &mut S,
    config: &AnalysisConfig,
) -> Result<MetadataRecord> {
    let format_class = classify(&file.content_type);
    let signature = sniff_source(source)?;
    let type_mismatch = mismatch_note(&file.content_type, signature);
    if let Some(note) = &type_mismatch {
        tracing::warn!("{}: {}", file.name, note);
    }

    let mut record = MetadataRecord::new(file, format_class);
    record.type_mismatch = type_mismatch;

    if format_class == FormatClass::NonImage {
        tracing::debug!("{} is not declared as an image, skipping decode", record.file.name);
        return Ok(record);
    }

    let attributes = match read_attributes(source) {
        Ok(attributes) => attributes,
        Err(e) => {
            tracing::warn!("Image decode failed for {}: {}", record.file.name, e);
            record.error = Some(e.to_string());
            source.seek_to(0)?;
            return Ok(record);
        }
    };

    tracing::debug!(
        "{}: {} {} {}x{}",
        record.file.name,
        attributes.format,
        attributes.mode,
        attributes.width,
        attributes.height
    );

    let has_tags = supports_tag_directory(&attributes.format);
    record.image = Some(attributes);

    if !has_tags {
        record.gps = Some(GpsStatus::Unavailable);
        return Ok(record);
    }

    let options = TagOptions {
        skip_maker_note: config.skip_maker_note,
    };
    match parse_tags(source, options) {
        Ok(parsed) => {
            record.gps = Some(resolve(&parsed.gps));
            record.exif = parsed.directory;
        }
        Err(e) => {
            tracing::warn!("Tag directory unreadable for {}: {}", record.file.name, e);
            record.error = Some(format!("tag directory: {}", e));
        }
    }

    source.seek_to(0)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn descriptor(name: &str, content_type: &str, size: usize) -> FileDescriptor {
        FileDescriptor {
            name: name.to_string(),
            content_type: content_type.to_string(),
            size_bytes: size as u64,
        }
    }

    #[test]
    fn test_non_image_skips_decode() {
        let data = b"plain evidence notes".to_vec();
        let mut cursor = Cursor::new(data.clone());

        let record = extract_metadata(
            descriptor("notes.txt", "text/plain", data.len()),
            &mut cursor,
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(record.format_class, FormatClass::NonImage);
        assert!(record.image.is_none());
        assert!(record.exif.is_empty());
        assert!(record.gps.is_none());
        assert!(record.error.is_none());
        assert!(record.type_mismatch.is_none());
    }

    #[test]
    fn test_corrupt_image_sets_error_only() {
        let data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x02, 0x13, 0x37];
        let mut cursor = Cursor::new(data.clone());

        let record = extract_metadata(
            descriptor("broken.jpg", "image/jpeg", data.len()),
            &mut cursor,
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert!(record.error.is_some());
        assert!(record.image.is_none());
        assert_eq!(record.file.size_bytes, data.len() as u64);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_mislabeled_pdf_keeps_declared_class() {
        let data = b"%PDF-1.7\n%%EOF\n".to_vec();
        let mut cursor = Cursor::new(data.clone());

        let record = extract_metadata(
            descriptor("photo.jpg", "image/jpeg", data.len()),
            &mut cursor,
            &AnalysisConfig::default(),
        )
        .unwrap();

        assert_eq!(record.format_class, FormatClass::Image);
        assert!(record.type_mismatch.is_some());
        assert!(record.error.is_some());
    }

    #[test]
    fn test_json_is_flat_for_file_fields() {
        let record = MetadataRecord::new(
            descriptor("a.txt", "text/plain", 1),
            FormatClass::NonImage,
        );
        let json: serde_json::Value = serde_json::from_str(&record.to_json().unwrap()).unwrap();

        assert_eq!(json["filename"], "a.txt");
        assert_eq!(json["content_type"], "text/plain");
        assert!(json["error"].is_null());
        assert!(json["exif"].as_object().unwrap().is_empty());
    }
}
