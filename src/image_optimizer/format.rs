//! Input format classification
//!
//! Classifies uploaded bytes into an [`ImageFamily`] without decoding pixels.
//! Three signals are consulted in order:
//! - Declared content-type (ignored when generic, e.g. `application/octet-stream`)
//! - Filename extension
//! - Leading magic bytes
//!
//! Classification never fails; anything unrecognized is [`ImageFamily::Unknown`],
//! which downstream stages treat as "try a native decode, then fail clearly".

use std::fmt;
use std::path::Path;

/// Known input families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFamily {
    Jpeg,
    Png,
    WebP,
    /// HEIC/HEIF containers (not decodable in-process)
    Heif,
    Tiff,
    Bmp,
    Gif,
    Unknown,
}

impl ImageFamily {
    /// Whether the in-process decoders are expected to handle this family
    pub fn is_natively_decodable(&self) -> bool {
        !matches!(self, ImageFamily::Heif)
    }

    /// File extension handed to external tools so they pick the right decoder
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFamily::Jpeg => "jpg",
            ImageFamily::Png => "png",
            ImageFamily::WebP => "webp",
            ImageFamily::Heif => "heic",
            ImageFamily::Tiff => "tiff",
            ImageFamily::Bmp => "bmp",
            ImageFamily::Gif => "gif",
            ImageFamily::Unknown => "bin",
        }
    }

    /// Matching decoder in the `image` crate, if any
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            ImageFamily::Jpeg => Some(image::ImageFormat::Jpeg),
            ImageFamily::Png => Some(image::ImageFormat::Png),
            ImageFamily::WebP => Some(image::ImageFormat::WebP),
            ImageFamily::Tiff => Some(image::ImageFormat::Tiff),
            ImageFamily::Bmp => Some(image::ImageFormat::Bmp),
            ImageFamily::Gif => Some(image::ImageFormat::Gif),
            ImageFamily::Heif | ImageFamily::Unknown => None,
        }
    }

    /// Lowercase label used in logs and error messages
    pub fn as_label(&self) -> &'static str {
        match self {
            ImageFamily::Jpeg => "jpeg",
            ImageFamily::Png => "png",
            ImageFamily::WebP => "webp",
            ImageFamily::Heif => "heif",
            ImageFamily::Tiff => "tiff",
            ImageFamily::Bmp => "bmp",
            ImageFamily::Gif => "gif",
            ImageFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ImageFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// HEIF brands found in the `ftyp` box of HEIC/HEIF files
const HEIF_BRANDS: &[&[u8; 4]] = &[
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"hevm", b"hevs", b"mif1", b"msf1",
];

/// Classify an upload.
///
/// # Arguments
/// * `data` - Raw upload bytes (only the first few bytes are inspected)
/// * `filename` - Original filename, if known
/// * `content_type` - Declared MIME type, if known
pub fn probe(data: &[u8], filename: Option<&str>, content_type: Option<&str>) -> ImageFamily {
    if let Some(family) = content_type.and_then(family_from_content_type) {
        return family;
    }

    if let Some(family) = filename.and_then(family_from_filename) {
        return family;
    }

    sniff_magic(data)
}

/// Map a declared content-type to a family.
///
/// Generic types carry no information and return `None` so the extension can
/// decide.
pub fn family_from_content_type(content_type: &str) -> Option<ImageFamily> {
    // Drop parameters such as "; charset=binary"
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match media_type.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFamily::Jpeg),
        "image/png" | "image/x-png" => Some(ImageFamily::Png),
        "image/webp" => Some(ImageFamily::WebP),
        "image/heic" | "image/heif" | "image/heic-sequence" | "image/heif-sequence" => {
            Some(ImageFamily::Heif)
        }
        "image/tiff" | "image/tif" => Some(ImageFamily::Tiff),
        "image/bmp" | "image/x-bmp" | "image/x-ms-bmp" => Some(ImageFamily::Bmp),
        "image/gif" => Some(ImageFamily::Gif),
        _ => None,
    }
}

/// Map a filename extension to a family.
pub fn family_from_filename(filename: &str) -> Option<ImageFamily> {
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" | "jpe" | "jfif" => Some(ImageFamily::Jpeg),
        "png" => Some(ImageFamily::Png),
        "webp" => Some(ImageFamily::WebP),
        "heic" | "heif" | "hif" => Some(ImageFamily::Heif),
        "tif" | "tiff" => Some(ImageFamily::Tiff),
        "bmp" | "dib" => Some(ImageFamily::Bmp),
        "gif" => Some(ImageFamily::Gif),
        _ => None,
    }
}

/// Identify a family from leading magic bytes.
pub fn sniff_magic(data: &[u8]) -> ImageFamily {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return ImageFamily::Jpeg;
    }
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return ImageFamily::Png;
    }
    if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        return ImageFamily::WebP;
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return ImageFamily::Gif;
    }
    if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        return ImageFamily::Tiff;
    }
    if data.starts_with(b"BM") && data.len() >= 14 {
        return ImageFamily::Bmp;
    }
    if is_heif_container(data) {
        return ImageFamily::Heif;
    }
    ImageFamily::Unknown
}

/// Check the ISO-BMFF `ftyp` box for a HEIF major or compatible brand.
fn is_heif_container(data: &[u8]) -> bool {
    if data.len() < 12 || &data[4..8] != b"ftyp" {
        return false;
    }

    let box_len = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let end = box_len.clamp(12, data.len());

    // Major brand at 8..12, minor version at 12..16, compatible brands after
    let major = &data[8..12];
    if HEIF_BRANDS.iter().any(|brand| &brand[..] == major) {
        return true;
    }

    data.get(16..end)
        .map(|brands| {
            brands
                .chunks_exact(4)
                .any(|b| HEIF_BRANDS.iter().any(|brand| &brand[..] == b))
        })
        .unwrap_or(false)
}
