/// Deterministic forensic report synthesis
///
/// The report is a pure function of the metadata record, the hash record and
/// the header template. Section order and presence never change; missing
/// values render as explicit placeholders.
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ReportLanguage;
use crate::forensics::HashRecord;
use crate::metadata::{FormatClass, GpsStatus, MetadataRecord};

/// Closing disclaimer, identical in every report
pub const DISCLAIMER: &str = "This report was generated automatically and contains raw forensic data. \
Interpretation and legal validation should be performed by a qualified analyst.";

/// Placeholder for a field with no value
pub const NOT_AVAILABLE: &str = "n/a";
pub const NO_TAGS_FOUND: &str = "no tags found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionKind {
    FileInformation,
    Hashes,
    Metadata,
    Conclusion,
}

impl SectionKind {
    /// Fixed section order
    pub fn all() -> [Self; 4] {
        [
            Self::FileInformation,
            Self::Hashes,
            Self::Metadata,
            Self::Conclusion,
        ]
    }
}

/// Header texts. Section order and the disclaimer are not configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTemplate {
    pub title: String,
    pub file_information: String,
    pub hashes: String,
    pub metadata: String,
    pub conclusion: String,
}

impl Default for ReportTemplate {
    fn default() -> Self {
        Self::english()
    }
}

impl ReportTemplate {
    pub fn english() -> Self {
        Self {
            title: "=== AI-AutoReport | Forensic Analysis ===".to_string(),
            file_information: "[File Information]".to_string(),
            hashes: "[Cryptographic Hashes]".to_string(),
            metadata: "[Metadata]".to_string(),
            conclusion: "[Conclusion]".to_string(),
        }
    }

    pub fn portuguese() -> Self {
        Self {
            title: "=== AI-AutoReport | Análise Forense ===".to_string(),
            file_information: "[Arquivo]".to_string(),
            hashes: "[Hashes]".to_string(),
            metadata: "[Metadados]".to_string(),
            conclusion: "[Conclusão]".to_string(),
        }
    }

    pub fn for_language(language: ReportLanguage) -> Self {
        match language {
            ReportLanguage::English => Self::english(),
            ReportLanguage::Portuguese => Self::portuguese(),
        }
    }

    pub fn header(&self, kind: SectionKind) -> &str {
        match kind {
            SectionKind::FileInformation => &self.file_information,
            SectionKind::Hashes => &self.hashes,
            SectionKind::Metadata => &self.metadata,
            SectionKind::Conclusion => &self.conclusion,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub header: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    pub sections: Vec<ReportSection>,
}

impl Report {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// UTF-8 text: title, then each section separated by a blank line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        for section in &self.sections {
            out.push('\n');
            out.push_str(&section.header);
            out.push('\n');
            for line in &section.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }

    /// SHA256 of the rendered text, for archiving alongside the report
    pub fn sha256(&self) -> String {
        format!("{:x}", Sha256::digest(self.render().as_bytes()))
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Assemble the report for one analysis.
pub fn synthesize(
    metadata: &MetadataRecord,
    hashes: &HashRecord,
    template: &ReportTemplate,
) -> Report {
    let sections = SectionKind::all()
        .into_iter()
        .map(|kind| ReportSection {
            kind,
            header: template.header(kind).to_string(),
            lines: match kind {
                SectionKind::FileInformation => file_lines(metadata),
                SectionKind::Hashes => hash_lines(hashes),
                SectionKind::Metadata => metadata_lines(metadata),
                SectionKind::Conclusion => vec![DISCLAIMER.to_string()],
            },
        })
        .collect();

    Report {
        title: template.title.clone(),
        sections,
    }
}

fn file_lines(metadata: &MetadataRecord) -> Vec<String> {
    let file = &metadata.file;
    vec![
        format!("Filename: {}", single_line(&file.name)),
        format!("Content-Type: {}", single_line(&file.content_type)),
        format!("Size (bytes): {}", file.size_bytes),
    ]
}

fn hash_lines(hashes: &HashRecord) -> Vec<String> {
    hashes
        .entries()
        .iter()
        .map(|(algorithm, digest)| format!("{}: {}", algorithm, digest))
        .collect()
}

fn metadata_lines(metadata: &MetadataRecord) -> Vec<String> {
    let mut lines = Vec::new();

    let class = match metadata.format_class {
        FormatClass::Image => "image",
        FormatClass::NonImage => "non-image",
    };
    lines.push(format!("Format class: {}", class));

    match &metadata.image {
        Some(image) => {
            lines.push(format!("Image format: {}", image.format));
            lines.push(format!("Color mode: {}", image.mode));
            lines.push(format!("Dimensions: {}x{}", image.width, image.height));
        }
        None => {
            lines.push(format!("Image format: {}", NOT_AVAILABLE));
            lines.push(format!("Color mode: {}", NOT_AVAILABLE));
            lines.push(format!("Dimensions: {}", NOT_AVAILABLE));
        }
    }

    lines.push("EXIF Data:".to_string());
    if metadata.exif.is_empty() {
        lines.push(format!("  ({})", NO_TAGS_FOUND));
    } else {
        for (key, value) in metadata.exif.iter() {
            lines.push(format!("  - {}: {}", single_line(key), single_line(value)));
        }
    }

    let gps = match &metadata.gps {
        Some(GpsStatus::Resolved {
            latitude,
            longitude,
        }) => format!("{:.6}, {:.6}", latitude, longitude),
        Some(GpsStatus::Unavailable) => "unavailable".to_string(),
        Some(GpsStatus::Malformed { reason }) => format!("malformed ({})", single_line(reason)),
        None => "not evaluated".to_string(),
    };
    lines.push(format!("GPS: {}", gps));

    lines.push(format!(
        "Type check: {}",
        metadata
            .type_mismatch
            .as_deref()
            .map(single_line)
            .unwrap_or_else(|| "no conflict detected".to_string())
    ));

    lines.push(format!(
        "Extraction status: {}",
        metadata
            .error
            .as_deref()
            .map(|e| format!("error: {}", single_line(e)))
            .unwrap_or_else(|| "ok".to_string())
    ));

    lines
}

/// Control characters would break the line structure of the report.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
