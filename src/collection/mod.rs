//! In-memory note collection mirrored to the key-value store.
//!
//! Insertion order is the persisted order. Every mutation rewrites the whole
//! `memos` value before returning.

use anyhow::{Context, Result};
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Attachment, Note, NoteId, NoteKind, Template};
use crate::session::SessionLock;
use crate::storage::{KeyValueStore, MEMOS_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter a title")]
    EmptyTitle,
    #[error("please enter some content")]
    EmptyContent,
}

#[derive(Debug, Error)]
pub enum CollectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unlock the session first")]
    SessionLocked,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Input for a new note.
#[derive(Debug, Clone, Default)]
pub struct NoteDraft {
    pub title: String,
    pub kind: NoteKind,
    pub template: Template,
    /// Markup for text notes, the canvas data URI for handwriting notes.
    pub content: String,
    pub attachments: Vec<Attachment>,
}

impl NoteDraft {
    pub fn text(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: NoteKind::Text,
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn handwriting(title: impl Into<String>, bitmap: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: NoteKind::Handwriting,
            content: bitmap.into(),
            ..Self::default()
        }
    }

    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if matches!(self.kind, NoteKind::Text)
            && self.content.trim().is_empty()
            && self.attachments.is_empty()
        {
            return Err(ValidationError::EmptyContent);
        }
        Ok(())
    }
}

/// Replacement fields for [`NoteCollection::update`]; `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

pub struct NoteCollection<S> {
    notes: Vec<Note>,
    store: S,
}

impl<S: KeyValueStore> NoteCollection<S> {
    /// Loads `memos`; a missing or unreadable value yields an empty collection.
    /// Records saved without an `id` are given one and written back at once.
    pub fn load(store: S) -> Result<Self> {
        let (notes, assigned) = match store.get(MEMOS_KEY)? {
            Some(raw) => match decode_notes(&raw) {
                Ok(decoded) => decoded,
                Err(err) => {
                    tracing::warn!(?err, "discarding unreadable note collection");
                    (Vec::new(), 0)
                }
            },
            None => (Vec::new(), 0),
        };
        tracing::debug!(count = notes.len(), "loaded notes");
        let collection = Self { notes, store };
        if assigned > 0 {
            collection.persist()?;
            tracing::info!(assigned, "assigned ids to notes saved without one");
        }
        Ok(collection)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Note> {
        self.notes.get(index)
    }

    pub fn index_of(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    pub fn find(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn add(&mut self, draft: NoteDraft) -> Result<NoteId, CollectionError> {
        draft.validate()?;
        let note = Note {
            id: NoteId::new(),
            title: draft.title.trim().to_string(),
            kind: draft.kind,
            template: draft.template,
            content: draft.content,
            attachments: draft.attachments,
            is_favorite: false,
            is_locked: false,
            created_at: OffsetDateTime::now_utc(),
            view_count: 0,
        };
        let id = note.id;
        tracing::info!(%id, kind = %note.kind, "adding note");
        self.notes.push(note);
        self.persist()?;
        Ok(id)
    }

    /// Removes the notes at `indices`; out-of-range and repeated indices are
    /// ignored. Returns how many notes were removed.
    pub fn delete(&mut self, indices: &[usize]) -> Result<usize> {
        let mut ordered: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&index| index < self.notes.len())
            .collect();
        // Highest first, so earlier removals never shift a pending index.
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();
        if ordered.is_empty() {
            return Ok(0);
        }
        for &index in &ordered {
            self.notes.remove(index);
        }
        tracing::info!(count = ordered.len(), "deleted notes");
        self.persist()?;
        Ok(ordered.len())
    }

    pub fn delete_ids(&mut self, ids: &[NoteId]) -> Result<usize> {
        let indices: Vec<usize> = ids.iter().filter_map(|&id| self.index_of(id)).collect();
        self.delete(&indices)
    }

    /// Returns `false` without touching anything when `index` is out of range.
    pub fn update(&mut self, index: usize, update: NoteUpdate) -> Result<bool> {
        let Some(note) = self.notes.get_mut(index) else {
            return Ok(false);
        };
        if let Some(title) = update.title {
            note.title = title;
        }
        if let Some(content) = update.content {
            note.content = content;
        }
        self.persist()?;
        Ok(true)
    }

    pub fn toggle_favorite(&mut self, index: usize) -> Result<Option<bool>> {
        let Some(note) = self.notes.get_mut(index) else {
            return Ok(None);
        };
        note.is_favorite = !note.is_favorite;
        let favorite = note.is_favorite;
        self.persist()?;
        Ok(Some(favorite))
    }

    /// Flips the note's lock flag. Only allowed while the session is unlocked.
    pub fn toggle_lock(
        &mut self,
        index: usize,
        session: &SessionLock,
    ) -> Result<Option<bool>, CollectionError> {
        if !session.is_unlocked() {
            return Err(CollectionError::SessionLocked);
        }
        let Some(note) = self.notes.get_mut(index) else {
            return Ok(None);
        };
        note.is_locked = !note.is_locked;
        let locked = note.is_locked;
        self.persist()?;
        Ok(Some(locked))
    }

    /// Opens a note for viewing, counting the view.
    pub fn open(
        &mut self,
        index: usize,
        session: &SessionLock,
    ) -> Result<Option<&Note>, CollectionError> {
        let Some(note) = self.notes.get_mut(index) else {
            return Ok(None);
        };
        if note.is_locked && !session.is_unlocked() {
            return Err(CollectionError::SessionLocked);
        }
        note.view_count += 1;
        self.persist()?;
        Ok(self.notes.get(index))
    }

    pub fn add_attachment(&mut self, index: usize, attachment: Attachment) -> Result<bool> {
        let Some(note) = self.notes.get_mut(index) else {
            return Ok(false);
        };
        note.attachments.push(attachment);
        self.persist()?;
        Ok(true)
    }

    pub fn remove_attachment(&mut self, index: usize, position: usize) -> Result<Option<Attachment>> {
        let Some(note) = self.notes.get_mut(index) else {
            return Ok(None);
        };
        if position >= note.attachments.len() {
            return Ok(None);
        }
        let removed = note.attachments.remove(position);
        self.persist()?;
        Ok(Some(removed))
    }

    fn persist(&self) -> Result<()> {
        let raw = serde_json::to_string(&self.notes).context("serializing notes")?;
        self.store.set(MEMOS_KEY, &raw).context("saving notes")
    }
}

/// Decodes the stored array, counting the records that carried no `id`.
fn decode_notes(raw: &str) -> serde_json::Result<(Vec<Note>, usize)> {
    let records: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let assigned = records
        .iter()
        .filter(|record| record.get("id").is_none())
        .count();
    let notes = serde_json::from_value(serde_json::Value::Array(records))?;
    Ok((notes, assigned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;

    fn collection_with(titles: &[&str]) -> anyhow::Result<NoteCollection<MemoryStore>> {
        let mut collection = NoteCollection::load(MemoryStore::default())?;
        for title in titles {
            collection.add(NoteDraft::text(*title, "body"))?;
        }
        Ok(collection)
    }

    fn titles<S: KeyValueStore>(collection: &NoteCollection<S>) -> Vec<&str> {
        collection.iter().map(|note| note.title.as_str()).collect()
    }

    #[test]
    fn add_appends_and_persists() -> anyhow::Result<()> {
        let mut collection = collection_with(&["first"])?;
        let draft = NoteDraft::text("  Second  ", "<p>hi</p>").with_template(Template::Grid);
        let id = collection.add(draft)?;

        assert_eq!(collection.len(), 2);
        let note = collection.get(1).expect("note");
        assert_eq!(note.id, id);
        assert_eq!(note.title, "Second");
        assert_eq!(note.content, "<p>hi</p>");
        assert_eq!(note.template, Template::Grid);
        assert_eq!(note.view_count, 0);
        assert!(!note.is_favorite && !note.is_locked);

        let reloaded = NoteCollection::load(collection.store())?;
        assert_eq!(reloaded.notes(), collection.notes());
        Ok(())
    }

    #[test]
    fn add_rejects_invalid_drafts_without_mutation() -> anyhow::Result<()> {
        let mut collection = collection_with(&[])?;
        assert_matches!(
            collection.add(NoteDraft::text("   ", "body")),
            Err(CollectionError::Validation(ValidationError::EmptyTitle))
        );
        assert_matches!(
            collection.add(NoteDraft::text("title", "  ")),
            Err(CollectionError::Validation(ValidationError::EmptyContent))
        );
        assert!(collection.is_empty());
        assert_eq!(collection.store().write_count(), 0);

        let with_attachment = NoteDraft::text("photo", "")
            .with_attachments(vec![Attachment::new("a.png", "image/png", b"x")]);
        collection.add(with_attachment)?;
        collection.add(NoteDraft::handwriting("sketch", ""))?;
        assert_eq!(collection.len(), 2);
        Ok(())
    }

    #[test]
    fn delete_removes_exactly_the_given_indices() -> anyhow::Result<()> {
        let mut collection = collection_with(&["a", "b", "c", "d", "e"])?;
        let removed = collection.delete(&[1, 3, 4])?;
        assert_eq!(removed, 3);
        assert_eq!(titles(&collection), vec!["a", "c"]);
        Ok(())
    }

    #[test]
    fn delete_ignores_duplicates_and_out_of_range() -> anyhow::Result<()> {
        let mut collection = collection_with(&["a", "b", "c"])?;
        let removed = collection.delete(&[0, 0, 7, 2])?;
        assert_eq!(removed, 2);
        assert_eq!(titles(&collection), vec!["b"]);
        assert_eq!(collection.delete(&[9])?, 0);
        Ok(())
    }

    #[test]
    fn delete_ids_resolves_current_positions() -> anyhow::Result<()> {
        let mut collection = collection_with(&["a", "b", "c"])?;
        let b = collection.get(1).map(|note| note.id).expect("b");
        let c = collection.get(2).map(|note| note.id).expect("c");
        collection.delete_ids(&[c, b])?;
        assert_eq!(titles(&collection), vec!["a"]);
        Ok(())
    }

    #[test]
    fn update_out_of_range_is_noop() -> anyhow::Result<()> {
        let mut collection = collection_with(&["a"])?;
        let writes = collection.store().write_count();
        assert!(!collection.update(4, NoteUpdate::default())?);
        assert_eq!(collection.store().write_count(), writes);

        let changed = collection.update(
            0,
            NoteUpdate {
                title: Some("renamed".into()),
                content: Some("<i>new</i>".into()),
            },
        )?;
        assert!(changed);
        let note = collection.get(0).expect("note");
        assert_eq!(note.title, "renamed");
        assert_eq!(note.content, "<i>new</i>");
        Ok(())
    }

    #[test]
    fn lock_requires_unlocked_session() -> anyhow::Result<()> {
        let mut collection = collection_with(&["secret"])?;
        let mut session = SessionLock::new();
        assert_matches!(
            collection.toggle_lock(0, &session),
            Err(CollectionError::SessionLocked)
        );

        session.set_password_and_unlock(collection.store(), "abcde", "abcde")?;
        assert_eq!(collection.toggle_lock(0, &session)?, Some(true));
        assert_eq!(collection.toggle_favorite(0)?, Some(true));
        assert_eq!(collection.toggle_favorite(3)?, None);

        session.lock();
        assert_matches!(
            collection.open(0, &session),
            Err(CollectionError::SessionLocked)
        );
        assert_eq!(collection.get(0).map(|note| note.view_count), Some(0));
        Ok(())
    }

    #[test]
    fn open_counts_views() -> anyhow::Result<()> {
        let mut collection = collection_with(&["a", "b"])?;
        let session = SessionLock::new();
        collection.open(1, &session)?;
        collection.open(1, &session)?;
        assert_eq!(collection.get(1).map(|note| note.view_count), Some(2));
        assert_eq!(collection.get(0).map(|note| note.view_count), Some(0));
        assert!(collection.open(5, &session)?.is_none());
        Ok(())
    }

    #[test]
    fn opening_reorders_most_viewed_projection() -> anyhow::Result<()> {
        use crate::view::{project, SortOrder, ViewQuery};

        let mut collection = collection_with(&["a", "b", "c"])?;
        let session = SessionLock::new();
        collection.open(1, &session)?;
        collection.open(1, &session)?;
        collection.open(2, &session)?;
        let query = ViewQuery {
            sort: SortOrder::MostViewed,
            ..ViewQuery::default()
        };
        let ranked = |collection: &NoteCollection<MemoryStore>| -> Vec<String> {
            project(collection.notes(), &query, false)
                .iter()
                .map(|row| row.note.title.clone())
                .collect()
        };
        assert_eq!(ranked(&collection), vec!["b", "c", "a"]);

        let top = project(collection.notes(), &query, false)[0].original_index;
        collection.open(top, &session)?;
        let counts: Vec<u64> = collection.iter().map(|note| note.view_count).collect();
        assert_eq!(counts, vec![0, 3, 1]);
        assert_eq!(ranked(&collection), vec!["b", "c", "a"]);

        let last = project(collection.notes(), &query, false)[2].original_index;
        for _ in 0..4 {
            collection.open(last, &session)?;
        }
        assert_eq!(ranked(&collection), vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn attachments_are_persisted_on_change() -> anyhow::Result<()> {
        let mut collection = collection_with(&["a"])?;
        let attachment = Attachment::new("clip.wav", "audio/wav", b"RIFF");
        assert!(collection.add_attachment(0, attachment.clone())?);
        assert!(!collection.add_attachment(3, attachment.clone())?);

        let reloaded = NoteCollection::load(collection.store())?;
        assert_eq!(reloaded.get(0).map(|note| note.attachments.len()), Some(1));

        assert_eq!(collection.remove_attachment(0, 0)?, Some(attachment));
        assert_eq!(collection.remove_attachment(0, 0)?, None);
        Ok(())
    }

    #[test]
    fn malformed_store_value_loads_empty() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        store.set(MEMOS_KEY, "{not json")?;
        let collection = NoteCollection::load(&store)?;
        assert!(collection.is_empty());
        Ok(())
    }

    #[test]
    fn records_without_ids_keep_the_id_assigned_on_first_load() -> anyhow::Result<()> {
        let store = MemoryStore::default();
        store.set(
            MEMOS_KEY,
            r#"[{"title":"old","type":"text","content":"x","createdAt":"2023-01-01T00:00:00.000Z"}]"#,
        )?;
        let first = NoteCollection::load(&store)?;
        let second = NoteCollection::load(&store)?;
        let first_id = first.get(0).map(|note| note.id);
        assert!(first_id.is_some());
        assert_eq!(second.get(0).map(|note| note.id), first_id);

        let raw = store.get(MEMOS_KEY)?.unwrap_or_default();
        assert!(raw.contains(r#""id":"#));
        Ok(())
    }
}
