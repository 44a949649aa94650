//! inkfusion-core - Core library for InkFusion
//!
//! This crate contains the note and draft models, the notes API client, the
//! session store, and the debounced autosave used by the InkFusion CLI.

pub mod api;
pub mod auth;
pub mod autosave;
pub mod collection;
pub mod config;
pub mod error;
pub mod media;
pub mod models;
pub mod session;
pub mod state;
pub mod util;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiError, HttpNotesApi, NotesApi};
pub use auth::{AuthClient, AuthError, User};
pub use autosave::AutosaveCoordinator;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use media::{ClipboardItem, DisplayMedia, MediaKind, MediaSource, PreviewRegistry};
pub use models::{
    DraftField, DraftKey, NoteDraft, NoteId, PendingAttachment, SavedMedia, ServerNote,
};
pub use session::{AuthToken, MemoryTokenStore, Session, SessionError, TokenStore};
pub use state::SaveState;
pub use workspace::NotesWorkspace;
