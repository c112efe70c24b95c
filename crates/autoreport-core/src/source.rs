/// Rewindable byte sources for uploaded content
///
/// Every stage of an analysis reads the same bytes from offset 0, so a source
/// must support positioned reads and report its length without being drained.
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Seekable, rereadable view of uploaded content
pub trait ByteSource: Read + Seek {
    /// Total length in bytes. The current position is preserved.
    fn length(&mut self) -> io::Result<u64> {
        let position = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if position != end {
            self.seek(SeekFrom::Start(position))?;
        }
        Ok(end)
    }

    /// Move to an absolute offset.
    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }

    /// Read at most `buf.len()` bytes, retrying on interruption.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

impl<T: Read + Seek + ?Sized> ByteSource for T {}

/// Immutable identity of an upload, fixed at ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    #[serde(rename = "filename")]
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// A named, typed byte source handed over by the hosting layer
#[derive(Debug)]
pub struct Upload<S> {
    descriptor: FileDescriptor,
    source: S,
}

impl<S: ByteSource> Upload<S> {
    /// Wrap a source, measuring its length once.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        mut source: S,
    ) -> io::Result<Self> {
        let size_bytes = source.length()?;
        source.seek_to(0)?;
        Ok(Self {
            descriptor: FileDescriptor {
                name: name.into(),
                content_type: content_type.into(),
                size_bytes,
            },
            source,
        })
    }

    pub fn descriptor(&self) -> &FileDescriptor {
        &self.descriptor
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_inner(self) -> S {
        self.source
    }
}

impl Upload<File> {
    /// Open a file on disk, using its file name as the declared name.
    pub fn open(path: impl AsRef<Path>, content_type: impl Into<String>) -> io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, content_type, File::open(path)?)
    }
}

impl Upload<Cursor<Arc<[u8]>>> {
    /// In-memory upload, typically bytes already received by a web handler.
    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        Self {
            descriptor: FileDescriptor {
                name: name.into(),
                content_type: content_type.into(),
                size_bytes: bytes.len() as u64,
            },
            source: Cursor::new(bytes),
        }
    }
}

/// Guess a declared content type from a file extension, the way a browser
/// fills in the type of an uploaded file.
pub fn content_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_length_preserves_position() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        cursor.seek_to(2).unwrap();

        assert_eq!(cursor.length().unwrap(), 5);
        assert_eq!(cursor.stream_position().unwrap(), 2);
    }

    #[test]
    fn test_upload_open_reads_descriptor() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("evidence.txt");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"Test data").unwrap();
        drop(file);

        let upload = Upload::open(&path, "text/plain").unwrap();
        let descriptor = upload.descriptor();

        assert_eq!(descriptor.name, "evidence.txt");
        assert_eq!(descriptor.content_type, "text/plain");
        assert_eq!(descriptor.size_bytes, 9);
    }

    #[test]
    fn test_descriptor_serializes_with_upload_keys() {
        let upload = Upload::from_bytes("a.bin", "application/octet-stream", vec![0u8; 3]);
        let json = serde_json::to_value(upload.descriptor()).unwrap();

        assert_eq!(json["filename"], "a.bin");
        assert_eq!(json["size_bytes"], 3);
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path(Path::new("IMG_01.JPG")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("scan.pdf")), "application/pdf");
        assert_eq!(content_type_for_path(Path::new("noext")), "application/octet-stream");
    }
}
