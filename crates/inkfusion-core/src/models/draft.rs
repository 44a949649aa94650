//! Note draft model
//!
//! The in-memory, editable form of a note. Media fields are private so the
//! one-preview-per-pending-attachment invariant can only change through the
//! tracker operations below.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::media::{DisplayMedia, MediaKind, MediaSource, PreviewRef, PreviewRegistry};

use super::attachment::{PendingAttachment, SavedMedia};
use super::note::{NoteId, ServerNote};

/// Tag used when a note has none.
pub const DEFAULT_TAG: &str = "General";

/// Local identity of a draft, stable across saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DraftKey(Uuid);

impl DraftKey {
    /// Create a new unique draft key using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for DraftKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DraftKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Editable text fields of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Description,
    Tag,
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Tag => "tag",
        };
        f.write_str(name)
    }
}

impl FromStr for DraftField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "description" | "desc" => Ok(Self::Description),
            "tag" => Ok(Self::Tag),
            other => Err(Error::InvalidInput(format!("Unknown note field: {other}"))),
        }
    }
}

/// Request body for a create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePayload {
    pub title: String,
    pub description: String,
    pub tag: String,
    /// New files to upload.
    pub files: Vec<PendingAttachment>,
    /// Saved locators the server should keep; anything omitted is dropped.
    pub existing_multimedia: Vec<String>,
}

impl SavePayload {
    /// `existingMultimedia` form value: a JSON array of locators.
    pub fn existing_multimedia_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.existing_multimedia)
    }
}

/// A note being edited, possibly not yet saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDraft {
    key: DraftKey,
    id: Option<NoteId>,
    title: String,
    description: String,
    tag: String,
    saved_media: Vec<SavedMedia>,
    pending: Vec<PendingAttachment>,
    previews: Vec<PreviewRef>,
    dirty: bool,
}

impl NoteDraft {
    /// A fresh, unsaved draft. Starts dirty.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            key: DraftKey::new(),
            id: None,
            title: String::new(),
            description: String::new(),
            tag: DEFAULT_TAG.to_string(),
            saved_media: Vec::new(),
            pending: Vec::new(),
            previews: Vec::new(),
            dirty: true,
        }
    }

    /// A clean draft mirroring a server note.
    #[must_use]
    pub fn from_server(note: ServerNote) -> Self {
        Self::saved(DraftKey::new(), note)
    }

    /// A clean draft mirroring a server note, keeping an existing local key.
    pub(crate) fn saved(key: DraftKey, note: ServerNote) -> Self {
        let tag = note
            .tag
            .filter(|tag| !tag.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TAG.to_string());
        Self {
            key,
            id: Some(note.id),
            title: note.title.unwrap_or_default(),
            description: note.description.unwrap_or_default(),
            tag,
            saved_media: note.multimedia,
            pending: Vec::new(),
            previews: Vec::new(),
            dirty: false,
        }
    }

    #[must_use]
    pub const fn key(&self) -> DraftKey {
        self.key
    }

    #[must_use]
    pub const fn id(&self) -> Option<&NoteId> {
        self.id.as_ref()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Title => &self.title,
            DraftField::Description => &self.description,
            DraftField::Tag => &self.tag,
        }
    }

    #[must_use]
    pub fn saved_media(&self) -> &[SavedMedia] {
        &self.saved_media
    }

    #[must_use]
    pub fn pending_attachments(&self) -> &[PendingAttachment] {
        &self.pending
    }

    #[must_use]
    pub fn previews(&self) -> &[PreviewRef] {
        &self.previews
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Overwrite a text field and mark the draft dirty.
    pub fn set_field(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DraftField::Title => self.title = value,
            DraftField::Description => self.description = value,
            DraftField::Tag => self.tag = value,
        }
        self.dirty = true;
    }

    /// No text and no media of any kind. The tag and identity do not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.description.is_empty()
            && self.saved_media.is_empty()
            && self.pending.is_empty()
    }

    /// Drafts that must never be sent to the server: empty and never created.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        self.id.is_none() && self.is_empty()
    }

    /// Queue files for upload, creating one preview per file.
    ///
    /// Returns how many files were added.
    pub fn add_files(
        &mut self,
        files: impl IntoIterator<Item = PendingAttachment>,
        previews: &PreviewRegistry,
    ) -> usize {
        let before = self.pending.len();
        for file in files {
            self.previews.push(previews.create(&file));
            self.pending.push(file);
        }
        let added = self.pending.len() - before;
        if added > 0 {
            self.dirty = true;
        }
        added
    }

    /// Drop a saved attachment. Out-of-range indices leave the draft untouched.
    pub fn remove_saved_media(&mut self, index: usize) -> Option<SavedMedia> {
        if index >= self.saved_media.len() {
            return None;
        }
        let removed = self.saved_media.remove(index);
        self.dirty = true;
        Some(removed)
    }

    /// Drop a pending attachment and release its preview.
    /// Out-of-range indices leave the draft untouched.
    pub fn remove_pending_media(&mut self, index: usize) -> Option<PendingAttachment> {
        if index >= self.pending.len() {
            return None;
        }
        let preview = self.previews.remove(index);
        preview.revoke();
        let removed = self.pending.remove(index);
        self.dirty = true;
        Some(removed)
    }

    /// Release every preview locator held by this draft.
    pub(crate) fn release_previews(&mut self) {
        for preview in self.previews.drain(..) {
            preview.revoke();
        }
        self.pending.clear();
    }

    /// Build the body of the next create or update request.
    #[must_use]
    pub fn save_payload(&self) -> SavePayload {
        let tag = if self.tag.trim().is_empty() {
            DEFAULT_TAG.to_string()
        } else {
            self.tag.clone()
        };
        SavePayload {
            title: self.title.clone(),
            description: self.description.clone(),
            tag,
            files: self.pending.clone(),
            existing_multimedia: self
                .saved_media
                .iter()
                .map(|media| media.url.clone())
                .filter(|url| !url.is_empty())
                .collect(),
        }
    }

    /// Attachments in render order: saved media first, then previews.
    #[must_use]
    pub fn display_media(&self) -> Vec<DisplayMedia> {
        let saved = self
            .saved_media
            .iter()
            .enumerate()
            .map(|(index, media)| DisplayMedia {
                locator: media.url.clone(),
                kind: media.kind(),
                source: MediaSource::Saved(index),
            });
        let pending = self
            .previews
            .iter()
            .zip(&self.pending)
            .enumerate()
            .map(|(index, (preview, file))| DisplayMedia {
                locator: preview.locator().to_string(),
                kind: MediaKind::from_mime_type(file.mime_type()),
                source: MediaSource::Pending(index),
            });
        saved.chain(pending).collect()
    }
}

impl From<ServerNote> for NoteDraft {
    fn from(note: ServerNote) -> Self {
        Self::from_server(note)
    }
}
