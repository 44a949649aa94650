//! Attachment models

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::media::{infer_mime_type, MediaKind};

/// Attachment reference already persisted by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMedia {
    /// Opaque locator returned by the server.
    pub url: String,
    /// Original file name, when the server reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Content MIME type, when the server reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl SavedMedia {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: None,
            mime_type: None,
        }
    }

    /// How the attachment should be rendered.
    #[must_use]
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_locator(&self.url)
    }
}

/// A file queued for upload with the next save of its note.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingAttachment {
    file_name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl PendingAttachment {
    /// Create a pending attachment.
    ///
    /// An empty `mime_type` is inferred from the file name.
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self> {
        let file_name = file_name.into().trim().to_string();
        if file_name.is_empty() {
            return Err(Error::InvalidInput(
                "Attachment file name cannot be empty".to_string(),
            ));
        }
        let mime_type = infer_mime_type(Some(mime_type.into().as_str()), &file_name);

        Ok(Self {
            file_name,
            mime_type,
            bytes: bytes.into(),
        })
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    pub fn read_from(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("Not a file path: {}", path.display()))
            })?
            .to_string();
        let bytes = std::fs::read(path)?;
        Self::new(file_name, String::new(), bytes)
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for PendingAttachment {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PendingAttachment")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn pending_attachment_requires_file_name() {
        assert!(PendingAttachment::new("  ", "image/png", vec![1u8]).is_err());
    }

    #[test]
    fn pending_attachment_infers_missing_mime_type() {
        let attachment = PendingAttachment::new("clip.mp4", "", vec![0u8; 4]).unwrap();
        assert_eq!(attachment.mime_type(), "video/mp4");
        assert_eq!(attachment.len(), 4);
    }

    #[test]
    fn read_from_loads_bytes_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voice.wav");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"RIFF").unwrap();

        let attachment = PendingAttachment::read_from(&path).unwrap();
        assert_eq!(attachment.file_name(), "voice.wav");
        assert!(attachment.mime_type().starts_with("audio/"));
        assert_eq!(attachment.bytes(), b"RIFF");
    }

    #[test]
    fn saved_media_kind_follows_extension() {
        assert_eq!(SavedMedia::new("https://cdn.test/a.webm").kind(), MediaKind::Video);
        assert_eq!(SavedMedia::new("https://cdn.test/a.MP3").kind(), MediaKind::Audio);
        assert_eq!(SavedMedia::new("https://cdn.test/a.jpg").kind(), MediaKind::Image);
    }
}
