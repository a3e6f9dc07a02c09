use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use thiserror::Error;

use crate::shared::constants::MAX_IMAGE_SIZE;

pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/tiff",
];

pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] =
    &["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff", "tif"];

const SNIFF_LEN: u64 = 512;

#[derive(Debug, Error)]
pub enum ImageValidationError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("image is too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("invalid image type: {0}")]
    InvalidType(String),

    #[error("invalid image extension: {0}")]
    InvalidExtension(String),

    #[error("failed to read image: {0}")]
    OpenFailure(#[from] std::io::Error),
}

/// An image that passed every intake check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedImage {
    /// Lowercased extension of the original filename
    pub extension: String,
    /// Content type detected from the file's leading bytes
    pub content_type: &'static str,
}

/// Check an upload's size, declared type, extension and actual content.
///
/// Checks run in that order and the first failure wins. The sniffed content
/// type must match the declared one. The reader's position
/// is restored after the content is sniffed.
pub fn validate_image<R: Read + Seek>(
    file_name: &str,
    declared_type: &str,
    size: u64,
    reader: &mut R,
) -> Result<ValidatedImage, ImageValidationError> {
    if size == 0 {
        return Err(ImageValidationError::Empty);
    }
    if size > MAX_IMAGE_SIZE {
        return Err(ImageValidationError::TooLarge {
            size,
            max: MAX_IMAGE_SIZE,
        });
    }

    let declared = normalize_content_type(declared_type);
    if !ALLOWED_IMAGE_TYPES.contains(&declared.as_str()) {
        return Err(ImageValidationError::InvalidType(declared));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ImageValidationError::InvalidExtension(extension));
    }

    let head = peek(reader)?;
    let content_type = sniff_image_type(&head)
        .ok_or_else(|| ImageValidationError::InvalidType("unrecognized content".to_string()))?;
    if content_type != canonical_image_type(&declared) {
        return Err(ImageValidationError::InvalidType(format!(
            "declared {} but content is {}",
            declared, content_type
        )));
    }

    Ok(ValidatedImage {
        extension,
        content_type,
    })
}

/// Lowercase and strip parameters (`image/PNG; charset=x` -> `image/png`)
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `image/jpg` is a common alias of `image/jpeg`
fn canonical_image_type(content_type: &str) -> &str {
    match content_type {
        "image/jpg" => "image/jpeg",
        other => other,
    }
}

fn peek<R: Read + Seek>(reader: &mut R) -> Result<Vec<u8>, std::io::Error> {
    let start = reader.stream_position()?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    let read = reader.by_ref().take(SNIFF_LEN).read_to_end(&mut head);
    reader.seek(SeekFrom::Start(start))?;
    read?;
    Ok(head)
}

/// Detect an image type from magic bytes
pub fn sniff_image_type(head: &[u8]) -> Option<&'static str> {
    match head {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        [b'B', b'M', ..] => Some("image/bmp"),
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some("image/tiff"),
        _ => None,
    }
}
