/// Embedded tag directory (EXIF) extraction
///
/// Summary mode: every field is flattened to `"<group> <TagName>"` with a
/// primitive rendering of its value. MakerNote blobs can be skipped and no
/// descriptive prose (units, enum meanings) is produced.
use exif::{Context, Field, In, Reader, Tag, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;
use std::io::{self, BufReader};
use thiserror::Error;

use crate::metadata::gps::GpsTags;
use crate::source::ByteSource;

/// Containers the EXIF reader understands
const TAG_CONTAINERS: &[&str] = &["JPEG", "PNG", "TIFF", "WEBP"];

/// Insertion-ordered tag map; re-inserting a key replaces its value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDirectory {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl TagDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.index.get(&key) {
            Some(&position) => self.entries[position].1 = value,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&position| self.entries[position].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagDirectory {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut directory = Self::new();
        for (key, value) in iter {
            directory.insert(key, value);
        }
        directory
    }
}

impl Serialize for TagDirectory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TagOptions {
    pub skip_maker_note: bool,
}

impl Default for TagOptions {
    fn default() -> Self {
        Self {
            skip_maker_note: true,
        }
    }
}

/// Tag directory plus the raw GPS values needed for coordinate resolution
#[derive(Debug, Clone, Default)]
pub struct ParsedTags {
    pub directory: TagDirectory,
    pub gps: GpsTags,
}

#[derive(Debug, Error)]
pub enum TagError {
    #[error("{0}")]
    Exif(#[from] exif::Error),

    #[error("{0}")]
    Io(#[from] io::Error),
}

pub fn supports_tag_directory(format: &str) -> bool {
    TAG_CONTAINERS.contains(&format)
}

/// Extract the tag directory. A container without an EXIF block yields an
/// empty directory. The source is rewound before and after.
pub fn parse_tags<S: ByteSource + ?Sized>(
    source: &mut S,
    options: TagOptions,
) -> Result<ParsedTags, TagError> {
    source.seek_to(0)?;
    let mut reader = Reader::new();
    reader.continue_on_error(true);
    let outcome = reader.read_from_container(&mut BufReader::new(&mut *source));
    source.seek_to(0)?;

    let exif = match outcome {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(container)) => {
            tracing::debug!("No EXIF block in {} container", container);
            return Ok(ParsedTags::default());
        }
        Err(e) => e.distill_partial_result(|errors| {
            for error in errors {
                tracing::warn!("Skipping unreadable tag: {}", error);
            }
        })?,
    };

    let mut directory = TagDirectory::new();
    for field in exif.fields() {
        if options.skip_maker_note && field.tag == Tag::MakerNote {
            continue;
        }
        directory.insert(tag_key(field), render_value(&field.value));
    }

    let primary = |tag: Tag| exif.get_field(tag, In::PRIMARY).map(|f| f.value.clone());
    let gps = GpsTags {
        latitude: primary(Tag::GPSLatitude),
        latitude_ref: primary(Tag::GPSLatitudeRef),
        longitude: primary(Tag::GPSLongitude),
        longitude_ref: primary(Tag::GPSLongitudeRef),
    };

    tracing::debug!("Extracted {} tags", directory.len());
    Ok(ParsedTags { directory, gps })
}

fn group_name(field: &Field) -> String {
    match field.tag.context() {
        Context::Tiff if field.ifd_num == In::PRIMARY => "Image".to_string(),
        Context::Tiff if field.ifd_num == In::THUMBNAIL => "Thumbnail".to_string(),
        Context::Tiff => format!("IFD{}", field.ifd_num.index()),
        Context::Exif => "EXIF".to_string(),
        Context::Gps => "GPS".to_string(),
        Context::Interop => "Interoperability".to_string(),
        #[allow(unreachable_patterns)]
        _ => "Other".to_string(),
    }
}

/// `"<group> <TagName>"`, unknown tags by number
pub fn tag_key(field: &Field) -> String {
    let name = field.tag.to_string();
    let name = if name.starts_with("Tag(") {
        format!("Tag 0x{:04X}", field.tag.number())
    } else {
        name
    };
    format!("{} {}", group_name(field), name)
}

/// Primitive rendering: single values bare, several as `[a, b, c]`
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Ascii(parts) => parts
            .iter()
            .map(|p| ascii_text(p))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Byte(v) => list(v),
        Value::Short(v) => list(v),
        Value::Long(v) => list(v),
        Value::SByte(v) => list(v),
        Value::SShort(v) => list(v),
        Value::SLong(v) => list(v),
        Value::Float(v) => list(v),
        Value::Double(v) => list(v),
        Value::Rational(v) => list(v.iter().map(|r| ratio(r.num as i64, r.denom as i64))),
        Value::SRational(v) => list(v.iter().map(|r| ratio(r.num as i64, r.denom as i64))),
        Value::Undefined(bytes, _) if is_printable(bytes) => ascii_text(bytes),
        Value::Undefined(bytes, _) => list(bytes),
        other => format!("{:?}", other),
    }
}

fn list<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: ToString,
{
    let parts: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    if parts.len() == 1 {
        parts.into_iter().next().unwrap_or_default()
    } else {
        format!("[{}]", parts.join(", "))
    }
}

fn ratio(num: i64, denom: i64) -> String {
    if denom == 1 {
        num.to_string()
    } else {
        format!("{}/{}", num, denom)
    }
}

fn ascii_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn is_printable(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && bytes
            .iter()
            .all(|&b| b.is_ascii_graphic() || b == b' ' || b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exif::Rational;

    #[test]
    fn test_directory_keeps_first_position_last_value() {
        let mut directory = TagDirectory::new();
        directory.insert("Image Make", "Canon");
        directory.insert("Image Model", "EOS");
        directory.insert("Image Make", "Nikon");

        let entries: Vec<_> = directory.iter().collect();
        assert_eq!(entries, vec![("Image Make", "Nikon"), ("Image Model", "EOS")]);
        assert_eq!(directory.get("Image Make"), Some("Nikon"));
    }

    #[test]
    fn test_directory_serializes_in_order() {
        let directory: TagDirectory = [("b", "1"), ("a", "2")].into_iter().collect();
        let json = serde_json::to_string(&directory).unwrap();
        assert_eq!(json, r#"{"b":"1","a":"2"}"#);
    }

    #[test]
    fn test_render_primitives() {
        assert_eq!(render_value(&Value::Short(vec![1])), "1");
        assert_eq!(render_value(&Value::Short(vec![1, 2, 3])), "[1, 2, 3]");
        assert_eq!(
            render_value(&Value::Ascii(vec![b"Canon\0".to_vec()])),
            "Canon"
        );
        assert_eq!(
            render_value(&Value::Rational(vec![
                Rational { num: 40, denom: 1 },
                Rational { num: 4603, denom: 100 },
            ])),
            "[40, 4603/100]"
        );
        assert_eq!(render_value(&Value::Undefined(b"0230".to_vec(), 0)), "0230");
        assert_eq!(render_value(&Value::Undefined(vec![1, 2], 0)), "[1, 2]");
    }

    #[test]
    fn test_supported_containers() {
        assert!(supports_tag_directory("JPEG"));
        assert!(supports_tag_directory("WEBP"));
        assert!(!supports_tag_directory("GIF"));
        assert!(!supports_tag_directory("BMP"));
    }
}
