//! Local media handling for drafts.
//!
//! Preview locators for attachments that have not been uploaded yet,
//! clipboard image extraction, and the media kind used for rendering.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, Weak};

use regex::Regex;
use uuid::Uuid;

use crate::models::PendingAttachment;
use crate::util::{lock, unix_timestamp_millis};

const PREVIEW_SCHEME: &str = "blob:inkfusion/";
const FALLBACK_IMAGE_EXTENSION: &str = "png";

static VIDEO_LOCATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(mp4|webm)$").expect("Invalid regex"));
static AUDIO_LOCATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(mp3|wav)$").expect("Invalid regex"));

/// How an attachment is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Classify a persisted locator by its file extension.
    #[must_use]
    pub fn from_locator(locator: &str) -> Self {
        let path = locator.split(['?', '#']).next().unwrap_or(locator);
        if VIDEO_LOCATOR.is_match(path) {
            Self::Video
        } else if AUDIO_LOCATOR.is_match(path) {
            Self::Audio
        } else {
            Self::Image
        }
    }

    /// Classify a pending attachment by its MIME type.
    #[must_use]
    pub fn from_mime_type(mime_type: &str) -> Self {
        let normalized = mime_type.trim().to_ascii_lowercase();
        if normalized.starts_with("video/") {
            Self::Video
        } else if normalized.starts_with("audio/") {
            Self::Audio
        } else {
            Self::Image
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Where a displayed attachment lives inside its draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource {
    /// Index into the draft's saved media.
    Saved(usize),
    /// Index into the draft's pending attachments (and previews).
    Pending(usize),
}

/// One renderable attachment of a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayMedia {
    pub locator: String,
    pub kind: MediaKind,
    pub source: MediaSource,
}

/// Resolved content of a preview locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewContent {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

type PreviewTable = Mutex<HashMap<String, PreviewContent>>;

/// Registry of live preview locators.
///
/// Cloning shares the underlying table.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<PreviewTable>,
}

impl PreviewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a preview locator for an attachment.
    pub fn create(&self, attachment: &PendingAttachment) -> PreviewRef {
        let locator = format!("{PREVIEW_SCHEME}{}", Uuid::now_v7());
        lock(&self.entries).insert(
            locator.clone(),
            PreviewContent {
                mime_type: attachment.mime_type().to_string(),
                bytes: attachment.shared_bytes(),
            },
        );
        PreviewRef(Arc::new(PreviewHandle {
            locator,
            registry: Arc::downgrade(&self.entries),
        }))
    }

    /// Look up the content behind a locator; `None` once revoked.
    #[must_use]
    pub fn resolve(&self, locator: &str) -> Option<PreviewContent> {
        lock(&self.entries).get(locator).cloned()
    }

    /// Revoke a locator. Returns `false` if it was not live.
    pub fn revoke(&self, locator: &str) -> bool {
        lock(&self.entries).remove(locator).is_some()
    }

    /// Number of locators that have not been revoked.
    #[must_use]
    pub fn live_count(&self) -> usize {
        lock(&self.entries).len()
    }
}

/// Handle to a preview locator.
///
/// Revoked explicitly with [`PreviewRef::revoke`], or when the last clone
/// of the handle is dropped.
#[derive(Clone)]
pub struct PreviewRef(Arc<PreviewHandle>);

struct PreviewHandle {
    locator: String,
    registry: Weak<PreviewTable>,
}

impl PreviewHandle {
    fn revoke(&self) {
        if let Some(entries) = self.registry.upgrade() {
            lock(&entries).remove(&self.locator);
        }
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl PreviewRef {
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.0.locator
    }

    pub fn revoke(&self) {
        self.0.revoke();
    }
}

impl PartialEq for PreviewRef {
    fn eq(&self, other: &Self) -> bool {
        self.locator() == other.locator()
    }
}

impl Eq for PreviewRef {}

impl fmt::Debug for PreviewRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("PreviewRef").field(&self.locator()).finish()
    }
}

/// One entry of a clipboard paste.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardItem {
    pub mime_type: String,
    /// File content; `None` for entries that are not files (plain text, html).
    pub data: Option<Vec<u8>>,
}

impl ClipboardItem {
    #[must_use]
    pub fn file(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: Some(data),
        }
    }

    #[must_use]
    pub fn text(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: None,
        }
    }

    fn is_image(&self) -> bool {
        self.mime_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("image/")
    }
}

/// Turn the image entries of a clipboard paste into named attachments.
///
/// Non-image entries and entries without data are skipped. Names carry the
/// paste timestamp plus a sequence number, so several images pasted at once
/// do not collide.
pub fn extract_paste_images(items: &[ClipboardItem]) -> Vec<PendingAttachment> {
    let pasted_at = unix_timestamp_millis();
    items
        .iter()
        .filter(|item| item.is_image())
        .filter_map(|item| item.data.as_ref().map(|data| (item, data)))
        .enumerate()
        .filter_map(|(position, (item, data))| {
            let mime_type = item.mime_type.trim().to_ascii_lowercase();
            let file_name = format!(
                "pasted-{pasted_at}-{}.{}",
                position + 1,
                image_extension(&mime_type)
            );
            match PendingAttachment::new(file_name, mime_type, data.clone()) {
                Ok(attachment) => Some(attachment),
                Err(error) => {
                    tracing::warn!("Skipping pasted image: {}", error);
                    None
                }
            }
        })
        .collect()
}

/// Resolve the MIME type of an attachment.
///
/// A declared content type wins unless it is empty or the generic
/// `application/octet-stream`; otherwise the file extension decides.
#[must_use]
pub fn infer_mime_type(content_type: Option<&str>, file_name: &str) -> String {
    if let Some(content_type) = content_type {
        let trimmed = content_type.trim();
        if !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("application/octet-stream") {
            return trimmed.to_ascii_lowercase();
        }
    }

    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn image_extension(mime_type: &str) -> &'static str {
    let subtype = mime_type.split('/').nth(1).unwrap_or_default();
    mime_guess::get_mime_extensions_str(mime_type).map_or(FALLBACK_IMAGE_EXTENSION, |extensions| {
        extensions
            .iter()
            .find(|extension| **extension == subtype)
            .or_else(|| extensions.first())
            .copied()
            .unwrap_or(FALLBACK_IMAGE_EXTENSION)
    })
}
