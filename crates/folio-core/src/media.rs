//! # Image Type Detection
//!
//! Uploads are classified by their leading magic bytes, never by file name.
//! Only raster formats browsers render inline are accepted; SVG is excluded
//! because it can carry script.

use crate::error::ValidationError;

/// Supported upload image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Portable Network Graphics.
    Png,
    /// JPEG / JFIF.
    Jpeg,
    /// GIF87a or GIF89a.
    Gif,
    /// RIFF WebP.
    Webp,
}

impl ImageKind {
    /// Identify the image format from the first bytes of a file.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    /// Parse a MIME type such as `image/png`. Parameters are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(Self::Jpeg),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Canonical MIME type.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// File extension used for stored uploads.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
        }
    }

    /// Classify `bytes`, checking them against the declared content type when
    /// the client sent one.
    pub fn classify(bytes: &[u8], declared: Option<&str>) -> Result<Self, ValidationError> {
        let detected = Self::detect(bytes).ok_or_else(|| {
            ValidationError::UnsupportedImage("expected PNG, JPEG, GIF or WebP data".to_string())
        })?;

        match declared {
            None | Some("application/octet-stream") => Ok(detected),
            Some(mime) => match Self::from_mime(mime) {
                Some(kind) if kind == detected => Ok(detected),
                _ => Err(ValidationError::UnsupportedImage(format!(
                    "declared content type {mime} does not match {} data",
                    detected.mime()
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];

    #[test]
    fn detects_known_signatures() {
        assert_eq!(ImageKind::detect(PNG), Some(ImageKind::Png));
        assert_eq!(ImageKind::detect(JPEG), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::detect(b"GIF89a....."), Some(ImageKind::Gif));
        assert_eq!(ImageKind::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(ImageKind::Webp));
    }

    #[test]
    fn rejects_unknown_data() {
        assert_eq!(ImageKind::detect(b"<svg xmlns="), None);
        assert_eq!(ImageKind::detect(b""), None);
        assert_eq!(ImageKind::detect(b"RIFF\0\0\0\0WAVE"), None);
    }

    #[test]
    fn mime_parsing_ignores_parameters_and_case() {
        assert_eq!(ImageKind::from_mime("IMAGE/PNG; charset=binary"), Some(ImageKind::Png));
        assert_eq!(ImageKind::from_mime("image/jpg"), Some(ImageKind::Jpeg));
        assert_eq!(ImageKind::from_mime("image/svg+xml"), None);
    }

    #[test]
    fn classify_requires_matching_declared_type() {
        assert_eq!(ImageKind::classify(PNG, Some("image/png")).unwrap(), ImageKind::Png);
        assert_eq!(ImageKind::classify(PNG, None).unwrap(), ImageKind::Png);
        assert!(ImageKind::classify(PNG, Some("image/jpeg")).is_err());
        assert!(ImageKind::classify(b"hello", Some("image/png")).is_err());
    }

    #[test]
    fn extension_and_mime_agree() {
        for kind in [ImageKind::Png, ImageKind::Jpeg, ImageKind::Gif, ImageKind::Webp] {
            assert_eq!(ImageKind::from_mime(kind.mime()), Some(kind));
            assert!(!kind.extension().is_empty());
        }
    }
}
