use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::intake::ValidationError;

/// Image encodings accepted before compression and upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageEncoding {
    pub const fn content_type(self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
            ImageEncoding::Gif => "image/gif",
            ImageEncoding::Webp => "image/webp",
        }
    }

    /// Check a declared content type against the allow-list. `image/jpg` is accepted as
    /// an alias some mobile browsers emit.
    pub fn from_content_type(raw: &str) -> Result<Self, ValidationError> {
        let unsupported = || ValidationError::UnsupportedPhoto(raw.trim().to_string());
        let parsed: mime::Mime = raw.trim().parse().map_err(|_| unsupported())?;
        if parsed.type_() != mime::IMAGE {
            return Err(unsupported());
        }

        match parsed.subtype().as_str().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageEncoding::Jpeg),
            "png" => Ok(ImageEncoding::Png),
            "gif" => Ok(ImageEncoding::Gif),
            "webp" => Ok(ImageEncoding::Webp),
            _ => Err(unsupported()),
        }
    }
}

/// Validated photo bytes awaiting upload by the storage collaborator.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    encoding: ImageEncoding,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for PhotoUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoUpload")
            .field("encoding", &self.encoding)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

impl PhotoUpload {
    pub fn new(
        content_type: &str,
        bytes: Vec<u8>,
        max_bytes: usize,
    ) -> Result<Self, ValidationError> {
        let encoding = ImageEncoding::from_content_type(content_type)?;
        if bytes.is_empty() {
            return Err(ValidationError::MalformedPhoto("empty image payload"));
        }
        if bytes.len() > max_bytes {
            return Err(ValidationError::PhotoTooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }
        Ok(Self { encoding, bytes })
    }

    /// Parse a `data:image/<subtype>;base64,<payload>` URL. Whitespace inserted by mobile
    /// browsers is stripped before decoding.
    pub fn from_data_url(data_url: &str, max_bytes: usize) -> Result<Self, ValidationError> {
        let cleaned: String = data_url.chars().filter(|c| !c.is_whitespace()).collect();
        let rest = cleaned
            .strip_prefix("data:")
            .ok_or(ValidationError::MalformedPhoto("expected a data: URL"))?;
        let (content_type, payload) = rest
            .split_once(";base64,")
            .ok_or(ValidationError::MalformedPhoto("expected base64 encoding"))?;
        let encoding = ImageEncoding::from_content_type(content_type)?;
        let bytes = STANDARD
            .decode(payload)
            .map_err(|_| ValidationError::MalformedPhoto("payload is not valid base64"))?;
        Self::new(encoding.content_type(), bytes, max_bytes)
    }

    pub fn encoding(&self) -> ImageEncoding {
        self.encoding
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Pointer to an uploaded photo owned by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoReference {
    pub storage_key: String,
    pub content_type: String,
    pub size_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1024;

    #[test]
    fn accepts_allow_listed_content_types() {
        assert_eq!(
            ImageEncoding::from_content_type("image/jpeg").expect("jpeg"),
            ImageEncoding::Jpeg
        );
        assert_eq!(
            ImageEncoding::from_content_type("image/jpg").expect("jpg alias"),
            ImageEncoding::Jpeg
        );
        assert_eq!(
            ImageEncoding::from_content_type("IMAGE/WEBP").expect("webp"),
            ImageEncoding::Webp
        );
    }

    #[test]
    fn rejects_other_encodings() {
        for raw in ["image/heic", "image/svg+xml", "application/pdf", "jpeg", ""] {
            assert!(
                matches!(
                    ImageEncoding::from_content_type(raw),
                    Err(ValidationError::UnsupportedPhoto(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn decodes_data_url_with_stray_whitespace() {
        let encoded = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0]);
        let url = format!("data:image/jpeg;base64,{}\n{}", &encoded[..4], &encoded[4..]);

        let photo = PhotoUpload::from_data_url(&url, MAX).expect("valid data url");

        assert_eq!(photo.encoding(), ImageEncoding::Jpeg);
        assert_eq!(photo.bytes(), &[0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn rejects_malformed_data_urls() {
        assert!(matches!(
            PhotoUpload::from_data_url("image/png;base64,AAAA", MAX),
            Err(ValidationError::MalformedPhoto(_))
        ));
        assert!(matches!(
            PhotoUpload::from_data_url("data:image/png,AAAA", MAX),
            Err(ValidationError::MalformedPhoto(_))
        ));
        assert!(matches!(
            PhotoUpload::from_data_url("data:image/png;base64,%%%%", MAX),
            Err(ValidationError::MalformedPhoto(_))
        ));
        assert!(matches!(
            PhotoUpload::from_data_url("data:image/tiff;base64,AAAA", MAX),
            Err(ValidationError::UnsupportedPhoto(_))
        ));
    }

    #[test]
    fn enforces_size_limit() {
        match PhotoUpload::new("image/png", vec![1; 16], 8) {
            Err(ValidationError::PhotoTooLarge { size, max }) => {
                assert_eq!(size, 16);
                assert_eq!(max, 8);
            }
            other => panic!("expected size rejection, got {other:?}"),
        }
    }
}
