//! Media attachments crossing the evaluate boundary, and the external
//! sticker transcoding collaborator.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A media payload, base64-encoded so it serializes across the page
/// boundary unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaAttachment {
    pub mimetype: String,
    /// Base64-encoded payload bytes.
    pub data: String,
    pub filename: Option<String>,
    pub filesize: Option<u64>,
}

impl MediaAttachment {
    pub fn new(
        mimetype: impl Into<String>,
        data: impl Into<String>,
        filename: Option<String>,
    ) -> Self {
        Self {
            mimetype: mimetype.into(),
            data: data.into(),
            filename,
            filesize: None,
        }
    }

    /// Build an attachment from raw bytes.
    pub fn from_bytes(
        mimetype: impl Into<String>,
        bytes: &[u8],
        filename: Option<String>,
    ) -> Self {
        Self {
            mimetype: mimetype.into(),
            data: BASE64.encode(bytes),
            filename,
            filesize: Some(bytes.len() as u64),
        }
    }

    /// Decode the payload back into bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TranscodeError> {
        BASE64
            .decode(&self.data)
            .map_err(|e| TranscodeError(format!("invalid base64 payload: {e}")))
    }

    pub fn is_image(&self) -> bool {
        self.mimetype.starts_with("image/")
    }

    pub fn is_video(&self) -> bool {
        self.mimetype.starts_with("video/")
    }
}

/// Error from the external transcoding collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("sticker conversion failed: {0}")]
pub struct TranscodeError(pub String);

/// External codec service turning arbitrary media into a sticker-compatible
/// webp bitmap. Image media never reaches this trait; the page's native
/// encoder handles it.
#[async_trait]
pub trait StickerTranscoder: Send + Sync {
    async fn to_sticker(&self, media: &MediaAttachment) -> Result<MediaAttachment, TranscodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_roundtrip() {
        let media = MediaAttachment::from_bytes("image/png", b"\x89PNG\r\n", None);
        assert_eq!(media.filesize, Some(6));
        assert_eq!(media.to_bytes().unwrap(), b"\x89PNG\r\n");
    }

    #[test]
    fn test_media_kind_checks() {
        assert!(MediaAttachment::new("image/jpeg", "", None).is_image());
        assert!(MediaAttachment::new("video/mp4", "", None).is_video());
        assert!(!MediaAttachment::new("application/pdf", "", None).is_image());
    }
}
