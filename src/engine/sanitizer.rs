//! JPEG metadata stripping
//!
//! Declared JPEG uploads are decoded, rotated upright according to their
//! EXIF orientation tag and re-encoded without any metadata segments. Every
//! other payload passes through untouched. A payload that claims to be a
//! JPEG but is not one is also passed through, since the declared type is
//! client-supplied; only a real JPEG that fails to decode is an error.

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use std::io::Cursor;
use tracing::debug;

use crate::domain::mime;

/// The one content type that gets its metadata stripped
pub const SANITIZED_CONTENT_TYPE: &str = "image/jpeg";

/// Re-encode quality for stripped JPEGs
pub const JPEG_QUALITY: u8 = 75;

const EXIF_HEADER: &[u8] = b"Exif\0\0";
const ORIENTATION_TAG: u16 = 0x0112;
const TIFF_SHORT: u16 = 3;

/// Result of running a payload through the sanitizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeOutcome {
    /// Use the original payload as-is
    Unchanged,
    /// Replacement payload with metadata removed
    Sanitized { data: Bytes, size: u64 },
    /// The payload is a JPEG but could not be processed
    Failed(String),
}

/// Whether a declared content type goes through [`sanitize`]
pub fn requires_sanitizing(content_type: &str) -> bool {
    mime::normalize(content_type) == SANITIZED_CONTENT_TYPE
}

/// Strip metadata from `payload` if it is a JPEG declared as one.
pub fn sanitize(payload: &[u8], content_type: &str) -> SanitizeOutcome {
    if !requires_sanitizing(content_type) {
        return SanitizeOutcome::Unchanged;
    }

    match image::guess_format(payload) {
        Ok(ImageFormat::Jpeg) => {}
        other => {
            debug!(sniffed = ?other.ok(), "Declared JPEG is not a JPEG, storing as-is");
            return SanitizeOutcome::Unchanged;
        }
    }

    let orientation = exif_orientation(payload).unwrap_or(Orientation::Normal);

    let decoded = match image::load_from_memory_with_format(payload, ImageFormat::Jpeg) {
        Ok(img) => img,
        Err(e) => return SanitizeOutcome::Failed(format!("failed to decode image: {}", e)),
    };

    let upright = match orientation.apply(decoded) {
        img @ (DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_)) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };

    let mut buffer = Cursor::new(Vec::new());
    if let Err(e) = upright.write_to(&mut buffer, ImageOutputFormat::Jpeg(JPEG_QUALITY)) {
        return SanitizeOutcome::Failed(format!("failed to re-encode stripped JPEG: {}", e));
    }

    let data = Bytes::from(buffer.into_inner());
    let size = data.len() as u64;

    debug!(
        original_size = payload.len(),
        sanitized_size = size,
        orientation = ?orientation,
        "Stripped JPEG metadata"
    );

    SanitizeOutcome::Sanitized { data, size }
}

/// EXIF orientation values 1 through 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Orientation {
    Normal,
    FlipHorizontal,
    Rotate180,
    FlipVertical,
    Rotate90FlipHorizontal,
    Rotate90,
    Rotate270FlipHorizontal,
    Rotate270,
}

impl Orientation {
    fn from_exif(value: u16) -> Option<Self> {
        Some(match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Rotate90FlipHorizontal,
            6 => Orientation::Rotate90,
            7 => Orientation::Rotate270FlipHorizontal,
            8 => Orientation::Rotate270,
            _ => return None,
        })
    }

    /// Transform the decoded pixels so they display upright without the tag
    fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::Normal => img,
            Orientation::FlipHorizontal => img.fliph(),
            Orientation::Rotate180 => img.rotate180(),
            Orientation::FlipVertical => img.flipv(),
            Orientation::Rotate90FlipHorizontal => img.rotate90().fliph(),
            Orientation::Rotate90 => img.rotate90(),
            Orientation::Rotate270FlipHorizontal => img.rotate270().fliph(),
            Orientation::Rotate270 => img.rotate270(),
        }
    }
}

fn exif_orientation(jpeg: &[u8]) -> Option<Orientation> {
    read_tiff_orientation(find_exif_segment(jpeg)?)
}

/// TIFF payload of the first APP1 Exif segment, if any
fn find_exif_segment(jpeg: &[u8]) -> Option<&[u8]> {
    let mut pos = 2; // past SOI
    while pos + 4 <= jpeg.len() {
        if jpeg[pos] != 0xFF {
            return None;
        }
        let marker = jpeg[pos + 1];
        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            0x01 | 0xD0..=0xD8 => {
                pos += 2;
                continue;
            }
            // Metadata segments all precede the first scan
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        if len < 2 {
            return None;
        }
        let end = pos + 2 + len;
        let body = jpeg.get(pos + 4..end)?;
        if marker == 0xE1 && body.starts_with(EXIF_HEADER) {
            return Some(&body[EXIF_HEADER.len()..]);
        }
        pos = end;
    }
    None
}

/// Orientation entry of IFD0
fn read_tiff_orientation(tiff: &[u8]) -> Option<Orientation> {
    let big_endian = match tiff.get(0..2)? {
        [b'M', b'M'] => true,
        [b'I', b'I'] => false,
        _ => return None,
    };

    let u16_at = |offset: usize| -> Option<u16> {
        let b = tiff.get(offset..offset + 2)?;
        Some(if big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        })
    };
    let u32_at = |offset: usize| -> Option<u32> {
        let b = tiff.get(offset..offset + 4)?;
        Some(if big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })
    };

    if u16_at(2)? != 42 {
        return None;
    }

    let ifd = u32_at(4)? as usize;
    let entries = u16_at(ifd)? as usize;
    for i in 0..entries {
        let entry = ifd + 2 + i * 12;
        if u16_at(entry)? == ORIENTATION_TAG {
            if u16_at(entry + 2)? != TIFF_SHORT {
                return None;
            }
            return Orientation::from_exif(u16_at(entry + 8)?);
        }
    }
    None
}
