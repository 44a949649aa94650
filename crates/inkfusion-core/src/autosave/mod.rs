//! Debounced autosave.
//!
//! Every mutation re-arms one shared [`DebounceTimer`]. When it fires, each
//! dirty draft that is worth saving is sent to the server in its own task,
//! and the response replaces the draft with a clean copy. Drafts are matched
//! by [`DraftKey`], never by position, so a response for a draft that was
//! removed in the meantime is dropped instead of resurrecting it. A note
//! created for a draft the user deleted mid-save is deleted again; drafts
//! that merely vanished through a reload keep their server note.

mod timer;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::watch;

pub use timer::DebounceTimer;

use crate::api::NotesApi;
use crate::collection::SharedDrafts;
use crate::models::{DraftKey, NoteDraft, NoteId, SavePayload, ServerNote};
use crate::state::SaveState;
use crate::util::lock;

struct SaveJob {
    key: DraftKey,
    id: Option<NoteId>,
    payload: SavePayload,
}

struct Inner<A: NotesApi> {
    api: Arc<A>,
    drafts: SharedDrafts,
    timer: DebounceTimer,
    /// Drafts with a create or update outstanding.
    in_flight: Mutex<HashSet<DraftKey>>,
    /// Drafts whose server delete is outstanding.
    suspended: Mutex<HashSet<DraftKey>>,
    /// Drafts deleted by the user while a save was in flight.
    removed: Mutex<HashSet<DraftKey>>,
    state: watch::Sender<SaveState>,
    passes: AtomicU64,
}

/// Schedules and reconciles background saves for a draft collection.
///
/// Cloning yields another handle to the same coordinator.
pub struct AutosaveCoordinator<A: NotesApi> {
    inner: Arc<Inner<A>>,
}

impl<A: NotesApi> Clone for AutosaveCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: NotesApi> AutosaveCoordinator<A> {
    pub fn new(api: Arc<A>, drafts: SharedDrafts, window: Duration) -> Self {
        let (state, _) = watch::channel(SaveState::Idle);
        Self {
            inner: Arc::new(Inner {
                api,
                drafts,
                timer: DebounceTimer::new(window),
                in_flight: Mutex::new(HashSet::new()),
                suspended: Mutex::new(HashSet::new()),
                removed: Mutex::new(HashSet::new()),
                state,
                passes: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.inner.timer.window()
    }

    /// Re-arm the debounce timer after a draft changed.
    pub fn notify_mutation(&self) {
        let weak: Weak<Inner<A>> = Arc::downgrade(&self.inner);
        self.inner.timer.arm(move || {
            if let Some(inner) = weak.upgrade() {
                Inner::run_pass(&inner);
            }
        });
        self.inner.publish_state();
    }

    /// Skip the debounce window: save now and wait until nothing is pending.
    pub async fn flush(&self) {
        self.inner.timer.cancel();
        Inner::run_pass(&self.inner);
        self.wait_until_idle().await;
    }

    /// Resolve once no timer is armed and no save is in flight.
    pub async fn wait_until_idle(&self) {
        let mut receiver = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = receiver.wait_for(|state| *state == SaveState::Idle).await;
    }

    #[must_use]
    pub fn state(&self) -> SaveState {
        *self.inner.state.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.inner.state.subscribe()
    }

    /// Number of save passes evaluated so far.
    #[must_use]
    pub fn save_passes(&self) -> u64 {
        self.inner.passes.load(Ordering::SeqCst)
    }

    /// Keep a draft out of save passes while its delete is outstanding.
    pub(crate) fn suspend(&self, key: DraftKey) {
        lock(&self.inner.suspended).insert(key);
    }

    pub(crate) fn resume(&self, key: DraftKey) {
        lock(&self.inner.suspended).remove(&key);
    }

    /// Record that the user deleted a draft, so a create still in flight
    /// for it gets cleaned up on the server.
    pub(crate) fn mark_removed(&self, key: DraftKey) {
        if lock(&self.inner.in_flight).contains(&key) {
            lock(&self.inner.removed).insert(key);
        }
    }
}

impl<A: NotesApi> Inner<A> {
    fn run_pass(self: &Arc<Self>) {
        let pass = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let jobs = self.collect_jobs();
        tracing::debug!("Autosave pass {} submitting {} drafts", pass, jobs.len());
        self.publish_state();

        for job in jobs {
            tokio::spawn(Self::save(Arc::clone(self), job));
        }
    }

    /// Pick the drafts to save and mark them in flight.
    fn collect_jobs(&self) -> Vec<SaveJob> {
        let drafts = lock(&self.drafts);
        let mut in_flight = lock(&self.in_flight);
        let suspended = lock(&self.suspended);

        drafts
            .iter()
            .filter(|draft| draft.is_dirty())
            .filter_map(|draft| {
                let key = draft.key();
                if draft.is_skippable() {
                    tracing::debug!("Skipping empty draft {}", key);
                    return None;
                }
                if suspended.contains(&key) {
                    tracing::debug!("Skipping draft {} while its delete is pending", key);
                    return None;
                }
                if !in_flight.insert(key) {
                    tracing::debug!("Draft {} already has a save in flight", key);
                    return None;
                }
                Some(SaveJob {
                    key,
                    id: draft.id().cloned(),
                    payload: draft.save_payload(),
                })
            })
            .collect()
    }

    async fn save(self: Arc<Self>, job: SaveJob) {
        let SaveJob { key, id, payload } = job;
        let result = match &id {
            Some(id) => self.api.update(id, payload).await,
            None => self.api.create(payload).await,
        };

        match result {
            Ok(note) => {
                if let Some(orphan) = self.reconcile(key, id.is_none(), note) {
                    self.delete_orphan(&orphan).await;
                }
            }
            Err(error) => {
                tracing::error!("Autosave failed for draft {}: {}", key, error);
            }
        }

        lock(&self.in_flight).remove(&key);
        lock(&self.removed).remove(&key);
        self.publish_state();
    }

    /// Swap the saved draft for a clean copy of the server's note.
    ///
    /// Returns the id of a freshly created note whose draft the user deleted.
    fn reconcile(&self, key: DraftKey, created: bool, note: ServerNote) -> Option<NoteId> {
        let mut drafts = lock(&self.drafts);
        if drafts.find(key).is_some() {
            drafts.replace(NoteDraft::saved(key, note));
            tracing::debug!("Saved draft {}", key);
            return None;
        }

        tracing::warn!("Dropping save response for removed draft {}", key);
        let deleted_by_user = lock(&self.removed).remove(&key);
        (created && deleted_by_user && drafts.find_by_id(&note.id).is_none()).then_some(note.id)
    }

    async fn delete_orphan(&self, id: &NoteId) {
        match self.api.delete(id).await {
            Ok(()) => tracing::info!("Deleted note {} created for a removed draft", id),
            Err(error) => tracing::warn!("Failed to delete orphaned note {}: {}", id, error),
        }
    }

    fn publish_state(&self) {
        self.state.send_if_modified(|current| {
            let next = SaveState::from_flags(
                self.timer.is_armed(),
                !lock(&self.in_flight).is_empty(),
            );
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    use super::*;
    use crate::collection::DraftCollection;
    use crate::media::PreviewRegistry;
    use crate::models::{DraftField, PendingAttachment, SavedMedia};
    use crate::testing::FakeNotesApi;

    const WINDOW: Duration = Duration::from_millis(800);

    struct Harness {
        api: Arc<FakeNotesApi>,
        drafts: SharedDrafts,
        autosave: AutosaveCoordinator<FakeNotesApi>,
    }

    impl Harness {
        fn new(api: FakeNotesApi) -> Self {
            let api = Arc::new(api);
            let drafts = DraftCollection::new().shared();
            let autosave =
                AutosaveCoordinator::new(Arc::clone(&api), Arc::clone(&drafts), WINDOW);
            Self {
                api,
                drafts,
                autosave,
            }
        }

        fn insert(&self, draft: NoteDraft) -> DraftKey {
            let key = draft.key();
            lock(&self.drafts).prepend(draft);
            self.autosave.notify_mutation();
            key
        }

        fn edit(&self, key: DraftKey, field: DraftField, value: &str) {
            lock(&self.drafts)
                .find_mut(key)
                .unwrap()
                .set_field(field, value);
            self.autosave.notify_mutation();
        }

        fn draft(&self, key: DraftKey) -> Option<NoteDraft> {
            lock(&self.drafts).find(key).cloned()
        }
    }

    fn server_note(id: &str, title: &str, media: &[&str]) -> ServerNote {
        ServerNote {
            id: id.parse().unwrap(),
            title: Some(title.to_string()),
            description: Some(String::new()),
            tag: Some("General".to_string()),
            multimedia: media.iter().map(|url| SavedMedia::new(*url)).collect(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_coalesces_into_one_create() {
        let harness = Harness::new(FakeNotesApi::new());
        let key = harness.insert(NoteDraft::empty());

        for (step, title) in ["G", "Gr", "Groceries"].into_iter().enumerate() {
            if step > 0 {
                tokio::time::advance(Duration::from_millis(300)).await;
            }
            harness.edit(key, DraftField::Title, title);
        }
        let last_edit = Instant::now();
        assert_eq!(harness.autosave.state(), SaveState::PendingSave);

        harness.autosave.wait_until_idle().await;

        assert!(last_edit.elapsed() >= WINDOW);
        let creates = harness.api.creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].title, "Groceries");
        assert_eq!(creates[0].tag, "General");
        assert_eq!(creates[0].existing_multimedia_json().unwrap(), "[]");
        assert_eq!(harness.autosave.save_passes(), 1);

        let saved = harness.draft(key).unwrap();
        assert_eq!(saved.id().map(NoteId::as_str), Some("note-1"));
        assert!(!saved.is_dirty());
        assert_eq!(harness.autosave.state(), SaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_new_draft_is_never_sent() {
        let harness = Harness::new(FakeNotesApi::new());
        let key = harness.insert(NoteDraft::empty());

        harness.autosave.wait_until_idle().await;

        assert_eq!(harness.autosave.save_passes(), 1);
        assert!(harness.api.creates().is_empty());
        let draft = harness.draft(key).unwrap();
        assert!(draft.is_dirty());
        assert!(draft.id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn emptied_saved_note_is_still_updated() {
        let harness = Harness::new(FakeNotesApi::with_notes(vec![server_note("n1", "Trip", &[])]));
        let key = harness.insert(NoteDraft::from_server(server_note("n1", "Trip", &[])));
        harness.edit(key, DraftField::Title, "");

        harness.autosave.wait_until_idle().await;

        let updates = harness.api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0.as_str(), "n1");
        assert_eq!(updates[0].1.title, "");
    }

    #[tokio::test(start_paused = true)]
    async fn removed_saved_media_is_left_out_of_existing_multimedia() {
        let note = server_note("n1", "Trip", &["https://cdn.test/a.png", "https://cdn.test/b.png"]);
        let harness = Harness::new(FakeNotesApi::with_notes(vec![note.clone()]));
        let key = harness.insert(NoteDraft::from_server(note));

        lock(&harness.drafts)
            .find_mut(key)
            .unwrap()
            .remove_saved_media(0);
        harness.autosave.notify_mutation();
        harness.autosave.wait_until_idle().await;

        let updates = harness.api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].1.existing_multimedia_json().unwrap(),
            r#"["https://cdn.test/b.png"]"#
        );
        assert_eq!(
            harness.draft(key).unwrap().saved_media(),
            &[SavedMedia::new("https://cdn.test/b.png")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn saved_response_clears_pending_files_and_previews() {
        let registry = PreviewRegistry::new();
        let harness = Harness::new(FakeNotesApi::new());
        let mut draft = NoteDraft::empty();
        draft.add_files(
            [PendingAttachment::new("photo.png", "image/png", vec![7u8; 4]).unwrap()],
            &registry,
        );
        let key = harness.insert(draft);

        harness.autosave.wait_until_idle().await;

        let creates = harness.api.creates();
        assert_eq!(creates.len(), 1);
        assert_eq!(creates[0].files.len(), 1);
        let saved = harness.draft(key).unwrap();
        assert!(saved.pending_attachments().is_empty());
        assert!(saved.previews().is_empty());
        assert_eq!(saved.saved_media(), &[SavedMedia::new("https://cdn.test/photo.png")]);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_leaves_draft_dirty_without_retry() {
        let api = FakeNotesApi::new();
        api.fail_saves(true);
        let harness = Harness::new(api);
        let key = harness.insert(NoteDraft::empty());
        harness.edit(key, DraftField::Title, "Groceries");

        harness.autosave.wait_until_idle().await;
        tokio::time::sleep(WINDOW * 4).await;

        assert_eq!(harness.api.creates().len(), 1);
        let draft = harness.draft(key).unwrap();
        assert!(draft.is_dirty());
        assert_eq!(draft.title(), "Groceries");
        assert!(draft.id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_block_other_saves() {
        let harness = Harness::new(FakeNotesApi::with_notes(vec![server_note("n1", "Trip", &[])]));
        let missing = harness.insert(NoteDraft::from_server(server_note("gone", "Old", &[])));
        let present = harness.insert(NoteDraft::from_server(server_note("n1", "Trip", &[])));
        harness.edit(missing, DraftField::Title, "Old 2");
        harness.edit(present, DraftField::Title, "Trip 2");

        harness.autosave.wait_until_idle().await;

        assert_eq!(harness.api.updates().len(), 2);
        assert!(harness.draft(missing).unwrap().is_dirty());
        let saved = harness.draft(present).unwrap();
        assert!(!saved.is_dirty());
        assert_eq!(saved.title(), "Trip 2");
    }

    #[tokio::test(start_paused = true)]
    async fn edits_during_save_wait_for_the_next_pass() {
        let api = FakeNotesApi::new();
        api.hold_saves();
        let harness = Harness::new(api);
        let key = harness.insert(NoteDraft::empty());
        harness.edit(key, DraftField::Title, "Groceries");

        tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;
        assert_eq!(harness.autosave.state(), SaveState::Saving);

        harness.edit(key, DraftField::Description, "milk");
        assert_eq!(harness.autosave.state(), SaveState::PendingSave);

        // The second pass fires while the create is still outstanding.
        tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;
        assert_eq!(harness.autosave.save_passes(), 2);

        harness.api.release(1);
        harness.autosave.wait_until_idle().await;

        assert_eq!(harness.api.creates().len(), 1);
        let draft = harness.draft(key).unwrap();
        assert_eq!(draft.id().map(NoteId::as_str), Some("note-1"));
        assert_eq!(draft.description(), "");
        assert!(!draft.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn response_for_removed_draft_is_dropped_and_orphan_deleted() {
        let api = FakeNotesApi::new();
        api.hold_saves();
        let harness = Harness::new(api);
        let key = harness.insert(NoteDraft::empty());
        harness.edit(key, DraftField::Title, "Temp");

        tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;
        assert_eq!(harness.autosave.state(), SaveState::Saving);
        lock(&harness.drafts).remove(key);
        harness.autosave.mark_removed(key);

        harness.api.release(1);
        harness.autosave.wait_until_idle().await;

        assert!(harness.draft(key).is_none());
        assert!(lock(&harness.drafts).is_empty());
        assert_eq!(
            harness.api.deletes().iter().map(NoteId::as_str).collect::<Vec<_>>(),
            vec!["note-1"]
        );
        assert!(harness.api.server_notes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn create_for_draft_dropped_without_user_delete_is_kept() {
        let api = FakeNotesApi::new();
        api.hold_saves();
        let harness = Harness::new(api);
        let key = harness.insert(NoteDraft::empty());
        harness.edit(key, DraftField::Title, "Groceries");

        tokio::time::sleep(WINDOW + Duration::from_millis(1)).await;
        lock(&harness.drafts).replace_all(Vec::new());

        harness.api.release(1);
        harness.autosave.wait_until_idle().await;

        assert!(harness.draft(key).is_none());
        assert!(harness.api.deletes().is_empty());
        assert_eq!(harness.api.server_notes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn mark_removed_without_save_in_flight_is_ignored() {
        let harness = Harness::new(FakeNotesApi::new());
        let key = harness.insert(NoteDraft::empty());
        harness.autosave.mark_removed(key);

        assert!(lock(&harness.autosave.inner.removed).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_saves_without_waiting_for_the_window() {
        let harness = Harness::new(FakeNotesApi::new());
        let key = harness.insert(NoteDraft::empty());
        harness.edit(key, DraftField::Title, "Now");
        let started = Instant::now();

        harness.autosave.flush().await;

        assert!(started.elapsed() < WINDOW);
        assert_eq!(harness.api.creates().len(), 1);
        assert!(!harness.draft(key).unwrap().is_dirty());
        assert_eq!(harness.autosave.state(), SaveState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn suspended_drafts_are_skipped() {
        let harness = Harness::new(FakeNotesApi::with_notes(vec![server_note("n1", "Trip", &[])]));
        let key = harness.insert(NoteDraft::from_server(server_note("n1", "Trip", &[])));
        harness.autosave.suspend(key);
        harness.edit(key, DraftField::Title, "Trip 2");

        harness.autosave.wait_until_idle().await;
        assert!(harness.api.updates().is_empty());

        harness.autosave.resume(key);
        harness.autosave.flush().await;
        assert_eq!(harness.api.updates().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_observe_state_transitions() {
        let harness = Harness::new(FakeNotesApi::new());
        let mut states = harness.autosave.subscribe();
        assert_eq!(*states.borrow_and_update(), SaveState::Idle);

        let key = harness.insert(NoteDraft::empty());
        harness.edit(key, DraftField::Title, "x");
        states.changed().await.unwrap();
        assert_eq!(*states.borrow_and_update(), SaveState::PendingSave);

        harness.autosave.wait_until_idle().await;
        assert_eq!(*states.borrow_and_update(), SaveState::Idle);
    }
}
