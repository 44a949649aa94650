//! Ordered set of drafts shared by the workspace and the autosave coordinator.

use std::sync::{Arc, Mutex};

use crate::models::{DraftKey, NoteDraft, NoteId};

/// Drafts in display order, newest first.
///
/// Drafts leaving the collection release their preview locators.
#[derive(Debug, Default)]
pub struct DraftCollection {
    drafts: Vec<NoteDraft>,
}

pub type SharedDrafts = Arc<Mutex<DraftCollection>>;

impl DraftCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn shared(self) -> SharedDrafts {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NoteDraft> {
        self.drafts.iter()
    }

    #[must_use]
    pub fn position(&self, key: DraftKey) -> Option<usize> {
        self.drafts.iter().position(|draft| draft.key() == key)
    }

    #[must_use]
    pub fn find(&self, key: DraftKey) -> Option<&NoteDraft> {
        self.drafts.iter().find(|draft| draft.key() == key)
    }

    pub fn find_mut(&mut self, key: DraftKey) -> Option<&mut NoteDraft> {
        self.drafts.iter_mut().find(|draft| draft.key() == key)
    }

    #[must_use]
    pub fn find_by_id(&self, id: &NoteId) -> Option<&NoteDraft> {
        self.drafts.iter().find(|draft| draft.id() == Some(id))
    }

    pub fn prepend(&mut self, draft: NoteDraft) {
        self.drafts.insert(0, draft);
    }

    /// Swap the draft with `draft`'s key in place. Returns `false` if absent.
    pub fn replace(&mut self, draft: NoteDraft) -> bool {
        let Some(slot) = self.find_mut(draft.key()) else {
            return false;
        };
        let mut previous = std::mem::replace(slot, draft);
        previous.release_previews();
        true
    }

    pub fn remove(&mut self, key: DraftKey) -> Option<NoteDraft> {
        let index = self.position(key)?;
        let mut removed = self.drafts.remove(index);
        removed.release_previews();
        Some(removed)
    }

    pub fn replace_all(&mut self, drafts: Vec<NoteDraft>) {
        for mut previous in std::mem::replace(&mut self.drafts, drafts) {
            previous.release_previews();
        }
    }

    /// Owned copies of every draft, in order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<NoteDraft> {
        self.drafts.clone()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::media::PreviewRegistry;
    use crate::models::{PendingAttachment, ServerNote};

    fn saved(id: &str) -> NoteDraft {
        NoteDraft::from_server(ServerNote {
            id: id.parse().unwrap(),
            title: Some(id.to_string()),
            description: None,
            tag: None,
            multimedia: Vec::new(),
        })
    }

    #[test]
    fn prepend_puts_newest_first() {
        let mut drafts = DraftCollection::new();
        drafts.prepend(saved("a"));
        let fresh = NoteDraft::empty();
        let key = fresh.key();
        drafts.prepend(fresh);

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts.position(key), Some(0));
        assert!(drafts.find_by_id(&"a".parse().unwrap()).is_some());
    }

    #[test]
    fn replace_keeps_position_and_releases_previews() {
        let registry = PreviewRegistry::new();
        let mut drafts = DraftCollection::new();
        drafts.prepend(saved("b"));
        let mut editing = saved("a");
        let key = editing.key();
        editing.add_files(
            [PendingAttachment::new("x.png", "image/png", vec![1u8]).unwrap()],
            &registry,
        );
        drafts.prepend(editing);
        assert_eq!(registry.live_count(), 1);

        let replacement = NoteDraft::saved(
            key,
            ServerNote {
                id: "a".parse().unwrap(),
                title: Some("renamed".to_string()),
                description: None,
                tag: None,
                multimedia: Vec::new(),
            },
        );
        assert!(drafts.replace(replacement));

        assert_eq!(drafts.position(key), Some(0));
        assert_eq!(drafts.find(key).unwrap().title(), "renamed");
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn replace_of_missing_draft_is_rejected() {
        let mut drafts = DraftCollection::new();
        assert!(!drafts.replace(NoteDraft::empty()));
        assert!(drafts.is_empty());
    }

    #[test]
    fn remove_and_replace_all() {
        let mut drafts = DraftCollection::new();
        let first = saved("a");
        let key = first.key();
        drafts.prepend(first);
        drafts.prepend(saved("b"));

        assert!(drafts.remove(key).is_some());
        assert!(drafts.remove(key).is_none());

        drafts.replace_all(vec![saved("c"), saved("d"), saved("e")]);
        let titles = drafts.iter().map(NoteDraft::title).collect::<Vec<_>>();
        assert_eq!(titles, vec!["c", "d", "e"]);
    }
}
