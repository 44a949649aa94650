//! Data models for InkFusion

mod attachment;
mod draft;
mod note;

pub use attachment::{PendingAttachment, SavedMedia};
pub use draft::{DraftField, DraftKey, NoteDraft, SavePayload, DEFAULT_TAG};
pub use note::{NoteId, ServerNote};
