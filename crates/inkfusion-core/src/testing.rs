//! In-memory notes backend for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tokio::sync::Semaphore;

use crate::api::{ApiError, ApiResult, NotesApi};
use crate::models::{NoteId, SavePayload, SavedMedia, ServerNote};
use crate::util::lock;

#[derive(Debug, Default)]
struct FakeState {
    notes: Vec<ServerNote>,
    next_id: u64,
    creates: Vec<SavePayload>,
    updates: Vec<(NoteId, SavePayload)>,
    deletes: Vec<NoteId>,
}

/// Records every call. Saves can be made to fail or to block until
/// [`FakeNotesApi::release`] hands out permits.
#[derive(Debug)]
pub struct FakeNotesApi {
    state: Mutex<FakeState>,
    fail_fetch: AtomicBool,
    fail_saves: AtomicBool,
    fail_deletes: AtomicBool,
    gated: AtomicBool,
    gate: Semaphore,
}

impl FakeNotesApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            fail_fetch: AtomicBool::new(false),
            fail_saves: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
        }
    }

    pub fn with_notes(notes: Vec<ServerNote>) -> Self {
        let api = Self::new();
        lock(&api.state).notes = notes;
        api
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Block creates and updates until released.
    pub fn hold_saves(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    /// Let `count` blocked saves proceed.
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub fn creates(&self) -> Vec<SavePayload> {
        lock(&self.state).creates.clone()
    }

    pub fn updates(&self) -> Vec<(NoteId, SavePayload)> {
        lock(&self.state).updates.clone()
    }

    pub fn deletes(&self) -> Vec<NoteId> {
        lock(&self.state).deletes.clone()
    }

    pub fn server_notes(&self) -> Vec<ServerNote> {
        lock(&self.state).notes.clone()
    }

    async fn pass_gate(&self) {
        if self.gated.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
    }

    fn saved_note(id: NoteId, payload: &SavePayload) -> ServerNote {
        let uploaded = payload
            .files
            .iter()
            .map(|file| SavedMedia::new(format!("https://cdn.test/{}", file.file_name())));
        ServerNote {
            id,
            title: Some(payload.title.clone()),
            description: Some(payload.description.clone()),
            tag: Some(payload.tag.clone()),
            multimedia: payload
                .existing_multimedia
                .iter()
                .cloned()
                .map(SavedMedia::new)
                .chain(uploaded)
                .collect(),
        }
    }

    fn failure() -> ApiError {
        ApiError::Status {
            status: 500,
            message: "Internal Server Error".to_string(),
        }
    }
}

impl NotesApi for FakeNotesApi {
    async fn fetch_all(&self) -> ApiResult<Vec<ServerNote>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        Ok(self.server_notes())
    }

    async fn create(&self, payload: SavePayload) -> ApiResult<ServerNote> {
        self.pass_gate().await;
        let mut state = lock(&self.state);
        state.creates.push(payload.clone());
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        state.next_id += 1;
        let id = NoteId::try_from(format!("note-{}", state.next_id))
            .map_err(|error| ApiError::InvalidPayload(error.to_string()))?;
        let note = Self::saved_note(id, &payload);
        state.notes.insert(0, note.clone());
        Ok(note)
    }

    async fn update(&self, id: &NoteId, payload: SavePayload) -> ApiResult<ServerNote> {
        self.pass_gate().await;
        let mut state = lock(&self.state);
        state.updates.push((id.clone(), payload.clone()));
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        let note = Self::saved_note(id.clone(), &payload);
        match state.notes.iter_mut().find(|existing| existing.id == *id) {
            Some(existing) => *existing = note.clone(),
            None => {
                return Err(ApiError::Status {
                    status: 404,
                    message: "Not Found".to_string(),
                })
            }
        }
        Ok(note)
    }

    async fn delete(&self, id: &NoteId) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.deletes.push(id.clone());
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        state.notes.retain(|note| note.id != *id);
        Ok(())
    }
}
