//! Notes collection controller.
//!
//! [`NotesWorkspace`] owns the draft collection, forwards edits to the
//! draft model, and keeps the autosave coordinator informed.

use std::sync::Arc;

use crate::api::NotesApi;
use crate::autosave::AutosaveCoordinator;
use crate::collection::{DraftCollection, SharedDrafts};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::media::{extract_paste_images, ClipboardItem, DisplayMedia, PreviewRegistry};
use crate::models::{DraftField, DraftKey, NoteDraft, PendingAttachment, SavedMedia};
use crate::state::SaveState;
use crate::util::lock;

pub struct NotesWorkspace<A: NotesApi> {
    api: Arc<A>,
    drafts: SharedDrafts,
    previews: PreviewRegistry,
    autosave: AutosaveCoordinator<A>,
}

impl<A: NotesApi> NotesWorkspace<A> {
    pub fn new(api: A, config: &ClientConfig) -> Self {
        let api = Arc::new(api);
        let drafts = DraftCollection::new().shared();
        let autosave = AutosaveCoordinator::new(
            Arc::clone(&api),
            Arc::clone(&drafts),
            config.autosave_window(),
        );
        Self {
            api,
            drafts,
            previews: PreviewRegistry::new(),
            autosave,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub const fn autosave(&self) -> &AutosaveCoordinator<A> {
        &self.autosave
    }

    pub const fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    pub fn save_state(&self) -> SaveState {
        self.autosave.state()
    }

    /// Replace the collection with the server's notes.
    ///
    /// On failure the current drafts are left untouched.
    pub async fn load(&self) -> Result<usize> {
        let notes = match self.api.fetch_all().await {
            Ok(notes) => notes,
            Err(error) => {
                tracing::error!("Failed to fetch notes: {}", error);
                return Err(error.into());
            }
        };

        let drafts = notes
            .into_iter()
            .map(NoteDraft::from_server)
            .collect::<Vec<_>>();
        let count = drafts.len();
        lock(&self.drafts).replace_all(drafts);
        tracing::debug!("Loaded {} notes", count);
        Ok(count)
    }

    /// Put a blank draft at the top of the list. Nothing is sent until it has content.
    pub fn add_empty(&self) -> DraftKey {
        let draft = NoteDraft::empty();
        let key = draft.key();
        lock(&self.drafts).prepend(draft);
        self.autosave.notify_mutation();
        key
    }

    /// Delete a draft, and its server note if it has one.
    ///
    /// Drafts that were never saved disappear at once. Saved drafts are
    /// removed only after the server confirms; on failure the draft stays.
    pub async fn delete(&self, key: DraftKey) -> Result<()> {
        let id = lock(&self.drafts)
            .find(key)
            .ok_or(Error::DraftNotFound(key))?
            .id()
            .cloned();

        let Some(id) = id else {
            // Hold the collection so a finishing create cannot reconcile in between.
            let mut drafts = lock(&self.drafts);
            drafts.remove(key);
            self.autosave.mark_removed(key);
            drop(drafts);
            return Ok(());
        };

        self.autosave.suspend(key);
        let result = self.api.delete(&id).await;

        match result {
            Ok(()) => {
                lock(&self.drafts).remove(key);
                self.autosave.resume(key);
                tracing::debug!("Deleted note {}", id);
                Ok(())
            }
            Err(error) => {
                self.autosave.resume(key);
                tracing::error!("Failed to delete note {}: {}", id, error);
                Err(error.into())
            }
        }
    }

    pub fn set_field(&self, key: DraftKey, field: DraftField, value: impl Into<String>) -> Result<()> {
        self.edit(key, |draft| draft.set_field(field, value))?;
        self.autosave.notify_mutation();
        Ok(())
    }

    /// Queue files on a draft. Returns how many were added.
    pub fn add_files(&self, key: DraftKey, files: Vec<PendingAttachment>) -> Result<usize> {
        let added = self.edit(key, |draft| draft.add_files(files, &self.previews))?;
        if added > 0 {
            self.autosave.notify_mutation();
        }
        Ok(added)
    }

    /// Attach the images of a clipboard paste. Returns how many were added.
    pub fn paste(&self, key: DraftKey, items: &[ClipboardItem]) -> Result<usize> {
        self.add_files(key, extract_paste_images(items))
    }

    pub fn remove_saved_media(&self, key: DraftKey, index: usize) -> Result<Option<SavedMedia>> {
        let removed = self.edit(key, |draft| draft.remove_saved_media(index))?;
        if removed.is_some() {
            self.autosave.notify_mutation();
        }
        Ok(removed)
    }

    pub fn remove_pending_media(
        &self,
        key: DraftKey,
        index: usize,
    ) -> Result<Option<PendingAttachment>> {
        let removed = self.edit(key, |draft| draft.remove_pending_media(index))?;
        if removed.is_some() {
            self.autosave.notify_mutation();
        }
        Ok(removed)
    }

    /// Copies of every draft, newest first.
    pub fn drafts(&self) -> Vec<NoteDraft> {
        lock(&self.drafts).snapshot()
    }

    pub fn draft(&self, key: DraftKey) -> Option<NoteDraft> {
        lock(&self.drafts).find(key).cloned()
    }

    pub fn display_media(&self, key: DraftKey) -> Result<Vec<DisplayMedia>> {
        lock(&self.drafts)
            .find(key)
            .map(NoteDraft::display_media)
            .ok_or(Error::DraftNotFound(key))
    }

    /// Save everything now and wait for the results.
    pub async fn flush(&self) {
        self.autosave.flush().await;
    }

    fn edit<T>(&self, key: DraftKey, change: impl FnOnce(&mut NoteDraft) -> T) -> Result<T> {
        let mut drafts = lock(&self.drafts);
        let draft = drafts.find_mut(key).ok_or(Error::DraftNotFound(key))?;
        Ok(change(draft))
    }
}
