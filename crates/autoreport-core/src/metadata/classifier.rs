/// Format classification from the declared content type
///
/// Classification trusts the declared type only: a mislabeled file follows
/// its label. Content signatures are checked separately and can only attach
/// a mismatch note, never change the class.
use serde::{Deserialize, Serialize};
use std::io;

use crate::source::ByteSource;

/// Bytes inspected when sniffing a signature
pub const SNIFF_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatClass {
    Image,
    NonImage,
}

/// Classify by the primary token of the declared type (`image/...`).
pub fn classify(content_type: &str) -> FormatClass {
    let primary = content_type.split('/').next().unwrap_or_default().trim();
    if primary.eq_ignore_ascii_case("image") {
        FormatClass::Image
    } else {
        FormatClass::NonImage
    }
}

/// Known leading-byte signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    pub signature: &'static [u8],
    pub offset: usize,
    pub mime_type: &'static str,
    pub description: &'static str,
}

impl FileSignature {
    fn matches(&self, prefix: &[u8]) -> bool {
        prefix
            .get(self.offset..self.offset + self.signature.len())
            .is_some_and(|slice| slice == self.signature)
    }

    /// Primary token of the MIME type (`image`, `application`, ...)
    pub fn family(&self) -> &'static str {
        self.mime_type.split('/').next().unwrap_or_default()
    }
}

/// Signatures strong enough to contradict a declared type
pub static SIGNATURES: &[FileSignature] = &[
    FileSignature {
        signature: &[0xFF, 0xD8, 0xFF],
        offset: 0,
        mime_type: "image/jpeg",
        description: "JPEG Image",
    },
    FileSignature {
        signature: &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A],
        offset: 0,
        mime_type: "image/png",
        description: "PNG Image",
    },
    FileSignature {
        signature: b"GIF87a",
        offset: 0,
        mime_type: "image/gif",
        description: "GIF Image (87a)",
    },
    FileSignature {
        signature: b"GIF89a",
        offset: 0,
        mime_type: "image/gif",
        description: "GIF Image (89a)",
    },
    FileSignature {
        signature: &[0x49, 0x49, 0x2A, 0x00], // II*\0
        offset: 0,
        mime_type: "image/tiff",
        description: "TIFF Image (little-endian)",
    },
    FileSignature {
        signature: &[0x4D, 0x4D, 0x00, 0x2A], // MM\0*
        offset: 0,
        mime_type: "image/tiff",
        description: "TIFF Image (big-endian)",
    },
    FileSignature {
        signature: b"WEBP",
        offset: 8,
        mime_type: "image/webp",
        description: "WebP Image",
    },
    FileSignature {
        signature: b"%PDF",
        offset: 0,
        mime_type: "application/pdf",
        description: "PDF Document",
    },
    FileSignature {
        signature: &[0x50, 0x4B, 0x03, 0x04], // PK (ZIP-based)
        offset: 0,
        mime_type: "application/zip",
        description: "ZIP Archive",
    },
    FileSignature {
        signature: &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1], // OLE
        offset: 0,
        mime_type: "application/x-ole-storage",
        description: "Microsoft Office Legacy Document",
    },
];

/// Match leading bytes against the signature table.
pub fn sniff(prefix: &[u8]) -> Option<&'static FileSignature> {
    SIGNATURES.iter().find(|sig| sig.matches(prefix))
}

/// Sniff the start of a source, leaving it rewound.
pub fn sniff_source<S: ByteSource + ?Sized>(
    source: &mut S,
) -> io::Result<Option<&'static FileSignature>> {
    source.seek_to(0)?;
    let mut prefix = [0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = source.read_chunk(&mut prefix[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    source.seek_to(0)?;
    Ok(sniff(&prefix[..filled]))
}

/// Describe a disagreement between the declared type family and the content.
pub fn mismatch_note(content_type: &str, signature: Option<&FileSignature>) -> Option<String> {
    let signature = signature?;
    let declared = content_type.split('/').next().unwrap_or_default().trim();
    if declared.eq_ignore_ascii_case(signature.family()) {
        return None;
    }
    Some(format!(
        "declared {}, content looks like {} ({})",
        content_type.trim(),
        signature.mime_type,
        signature.description
    ))
}
