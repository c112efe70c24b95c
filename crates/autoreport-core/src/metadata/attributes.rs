/// Container-level image attributes
///
/// Only the header is decoded: the `image` crate decoder reports dimensions and
/// color type before any pixel data is touched.
use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek};
use thiserror::Error;

use crate::source::ByteSource;

/// Bytes of a JPEG handed to the decoder. The JPEG decoder buffers its whole
/// input before parsing, so it only ever sees this prefix; the markers up to
/// the first scan fit well inside it.
pub const JPEG_HEADER_BUDGET: u64 = 4 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttributes {
    /// Container format, e.g. `JPEG`, `PNG`
    pub format: String,
    /// Color mode, e.g. `RGB`, `RGBA`, `L`
    pub mode: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot identify image container")]
    UnknownContainer,

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Read format, color mode and dimensions. The source is rewound before and after.
///
/// Memory stays bounded for large uploads: JPEG input is capped at
/// `JPEG_HEADER_BUDGET`, other containers are read through a seekable stream.
pub fn read_attributes<S: ByteSource + ?Sized>(
    source: &mut S,
) -> Result<ImageAttributes, DecodeError> {
    source.seek_to(0)?;
    let result = decode_header(source);
    source.seek_to(0)?;
    result
}

fn decode_header<S: ByteSource + ?Sized>(source: &mut S) -> Result<ImageAttributes, DecodeError> {
    let format = {
        let reader = ImageReader::new(BufReader::new(&mut *source)).with_guessed_format()?;
        reader.format().ok_or(DecodeError::UnknownContainer)?
    };
    source.seek_to(0)?;

    if format == ImageFormat::Jpeg {
        let mut prefix = Vec::new();
        Read::take(&mut *source, JPEG_HEADER_BUDGET).read_to_end(&mut prefix)?;
        header_attributes(ImageReader::with_format(Cursor::new(prefix), format), format)
    } else {
        header_attributes(
            ImageReader::with_format(BufReader::new(&mut *source), format),
            format,
        )
    }
}

fn header_attributes<R: BufRead + Seek>(
    reader: ImageReader<R>,
    format: ImageFormat,
) -> Result<ImageAttributes, DecodeError> {
    let decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();

    Ok(ImageAttributes {
        format: format_name(format),
        mode: color_mode(decoder.color_type()),
        width,
        height,
    })
}

/// Upper-case container name
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

/// Short color mode label for a decoder color type
pub fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "L;16".to_string(),
        ColorType::La16 => "LA;16".to_string(),
        ColorType::Rgb16 => "RGB;16".to_string(),
        ColorType::Rgba16 => "RGBA;16".to_string(),
        ColorType::Rgb32F => "RGB;32F".to_string(),
        ColorType::Rgba32F => "RGBA;32F".to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageEncoder, RgbImage};
    use std::io::SeekFrom;

    /// Counts every byte handed out by the wrapped cursor
    struct CountingCursor {
        inner: Cursor<Vec<u8>>,
        bytes_read: u64,
    }

    impl Read for CountingCursor {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.bytes_read += n as u64;
            Ok(n)
        }
    }

    impl Seek for CountingCursor {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut out = Vec::new();
        image::codecs::png::PngEncoder::new(&mut out)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    #[test]
    fn test_png_attributes() {
        let mut cursor = Cursor::new(encode_png(7, 3));
        let attrs = read_attributes(&mut cursor).unwrap();

        assert_eq!(attrs.format, "PNG");
        assert_eq!(attrs.mode, "RGB");
        assert_eq!((attrs.width, attrs.height), (7, 3));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_large_jpeg_read_through_bounded_prefix() {
        let img = RgbImage::from_pixel(12, 5, image::Rgb([90, 90, 90]));
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut jpeg)
            .write_image(img.as_raw(), 12, 5, image::ExtendedColorType::Rgb8)
            .unwrap();
        jpeg.resize(jpeg.len() + 2 * JPEG_HEADER_BUDGET as usize, 0);

        let mut source = CountingCursor {
            inner: Cursor::new(jpeg),
            bytes_read: 0,
        };
        let attrs = read_attributes(&mut source).unwrap();

        assert_eq!(attrs.format, "JPEG");
        assert_eq!((attrs.width, attrs.height), (12, 5));
        assert!(
            source.bytes_read < JPEG_HEADER_BUDGET + 64 * 1024,
            "read {} bytes",
            source.bytes_read
        );
        assert_eq!(source.inner.position(), 0);
    }

    #[test]
    fn test_corrupt_header_is_error() {
        let mut png = encode_png(4, 4);
        png.truncate(20);
        let mut cursor = Cursor::new(png);

        assert!(read_attributes(&mut cursor).is_err());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_unknown_container() {
        let mut cursor = Cursor::new(b"definitely not an image".to_vec());
        assert!(matches!(
            read_attributes(&mut cursor),
            Err(DecodeError::UnknownContainer)
        ));
    }
}
