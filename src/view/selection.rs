use indexmap::IndexSet;

use crate::model::NoteId;

/// Notes marked for bulk deletion, in the order they were picked.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: IndexSet<NoteId>,
}

impl Selection {
    pub fn contains(&self, id: NoteId) -> bool {
        self.ids.contains(&id)
    }

    /// Returns whether the note is selected afterwards.
    pub fn toggle(&mut self, id: NoteId) -> bool {
        if self.ids.shift_remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn set(&mut self, id: NoteId, selected: bool) {
        if selected {
            self.ids.insert(id);
        } else {
            self.ids.shift_remove(&id);
        }
    }

    /// Replaces the selection with `ids`.
    pub fn select_all(&mut self, ids: impl IntoIterator<Item = NoteId>) {
        self.ids = ids.into_iter().collect();
    }

    /// True when every one of `visible` is selected and nothing else is.
    pub fn covers(&self, visible: &[NoteId]) -> bool {
        !visible.is_empty()
            && self.ids.len() == visible.len()
            && visible.iter().all(|id| self.ids.contains(id))
    }

    /// Drops ids that no longer name a note.
    pub fn retain_existing(&mut self, exists: impl Fn(NoteId) -> bool) {
        self.ids.retain(|id| exists(*id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn ids(&self) -> Vec<NoteId> {
        self.ids.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_then_removes() {
        let mut selection = Selection::default();
        let id = NoteId::new();
        assert!(selection.toggle(id));
        assert!(selection.contains(id));
        assert!(!selection.toggle(id));
        assert!(selection.is_empty());
    }

    #[test]
    fn select_all_replaces_and_covers_visible_rows() {
        let mut selection = Selection::default();
        let stale = NoteId::new();
        selection.toggle(stale);
        let visible = vec![NoteId::new(), NoteId::new()];
        selection.select_all(visible.iter().copied());
        assert!(!selection.contains(stale));
        assert!(selection.covers(&visible));
        selection.set(visible[0], false);
        assert!(!selection.covers(&visible));
        assert!(!Selection::default().covers(&[]));
    }

    #[test]
    fn retain_existing_prunes_deleted_notes() {
        let mut selection = Selection::default();
        let keep = NoteId::new();
        let gone = NoteId::new();
        selection.select_all([keep, gone]);
        selection.retain_existing(|id| id == keep);
        assert_eq!(selection.ids(), vec![keep]);
    }
}
