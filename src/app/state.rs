use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::collection::{CollectionError, NoteCollection, NoteDraft, NoteUpdate};
use crate::config::themes::{load_theme, save_theme};
use crate::config::{AppConfig, ThemeName};
use crate::drawing::{ink_for, DrawingPad};
use crate::model::{Attachment, NoteId, NoteKind, Template};
use crate::session::{self, SessionError, SessionLock, UnlockStep, MIN_PASSWORD_CHARS};
use crate::storage::KeyValueStore;
use crate::view::{
    self, markup_from_source, source_from_markup, InlineMark, NoteView, Selection, SortOrder,
    ViewQuery,
};

use super::editor::TextBuffer;

const MAX_TITLE_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Text,
    Handwriting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeField {
    Title,
    Body,
}

/// New-note composer, or the edit form of an existing note when `editing` is set.
#[derive(Debug, Clone)]
pub struct ComposeOverlay {
    pub editing: Option<NoteId>,
    pub kind: NoteKind,
    pub title: TextBuffer,
    pub body: TextBuffer,
    pub field: ComposeField,
    /// Body source as first shown; an unchanged body keeps the stored markup.
    pub original_body: String,
}

impl ComposeOverlay {
    pub fn active_buffer_mut(&mut self) -> &mut TextBuffer {
        match self.field {
            ComposeField::Body if self.kind == NoteKind::Text => &mut self.body,
            _ => &mut self.title,
        }
    }

    /// Inserts an empty mark pair in the body and places the cursor inside.
    pub fn insert_mark(&mut self, mark: InlineMark) -> bool {
        if self.kind != NoteKind::Text || self.field != ComposeField::Body {
            return false;
        }
        self.body.insert_pair(mark.delimiter());
        true
    }

    pub fn toggle_field(&mut self) {
        if self.kind == NoteKind::Text {
            self.field = match self.field {
                ComposeField::Title => ComposeField::Body,
                ComposeField::Body => ComposeField::Title,
            };
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewNoteOverlay {
    pub note_id: NoteId,
    pub attachment_cursor: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPurpose {
    Unlock,
    Change,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordStep {
    /// Unlocking with the stored password.
    Existing,
    /// Proving the old password before a change.
    Current,
    New,
    Confirm,
}

#[derive(Debug, Clone)]
pub struct PasswordOverlay {
    pub purpose: PasswordPurpose,
    pub step: PasswordStep,
    pub input: TextBuffer,
    old: Option<String>,
    first: Option<String>,
}

impl PasswordOverlay {
    fn new(purpose: PasswordPurpose, step: PasswordStep) -> Self {
        Self {
            purpose,
            step,
            input: TextBuffer::single_line(""),
            old: None,
            first: None,
        }
    }

    pub fn label(&self) -> String {
        match self.step {
            PasswordStep::Existing => "Password".to_string(),
            PasswordStep::Current => "Current password".to_string(),
            PasswordStep::New => format!("New password ({MIN_PASSWORD_CHARS}+ characters)"),
            PasswordStep::Confirm => "Confirm password".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmDeleteOverlay {
    pub ids: Vec<NoteId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachTarget {
    /// Attachments waiting for the next new note.
    Draft,
    Note(NoteId),
}

#[derive(Debug, Clone)]
pub struct AttachOverlay {
    pub target: AttachTarget,
    pub path: TextBuffer,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    Compose(ComposeOverlay),
    ViewNote(ViewNoteOverlay),
    Password(PasswordOverlay),
    ConfirmDelete(ConfirmDeleteOverlay),
    Attach(AttachOverlay),
    Help,
}

/// Everything the terminal front-end knows, in one place.
pub struct AppState<S> {
    collection: NoteCollection<S>,
    session: SessionLock,
    query: ViewQuery,
    selection: Selection,
    drawing: DrawingPad,
    mode: EditorMode,
    template: Template,
    theme: ThemeName,
    preview_chars: usize,
    export_dir: PathBuf,
    cursor: usize,
    search_active: bool,
    pending_attachments: Vec<Attachment>,
    overlay: Option<OverlayState>,
    status_message: Option<String>,
}

impl<S: KeyValueStore> AppState<S> {
    pub fn new(collection: NoteCollection<S>, config: &AppConfig, export_dir: PathBuf) -> Result<Self> {
        let theme = load_theme(collection.store(), config.theme).context("loading theme")?;
        Ok(Self {
            collection,
            session: SessionLock::new(),
            query: ViewQuery {
                sort: config.default_sort,
                ..ViewQuery::default()
            },
            selection: Selection::default(),
            drawing: DrawingPad::new(&config.drawing),
            mode: EditorMode::Text,
            template: config.default_template,
            theme,
            preview_chars: config.preview_chars,
            export_dir,
            cursor: 0,
            search_active: false,
            pending_attachments: Vec::new(),
            overlay: None,
            status_message: None,
        })
    }

    pub fn collection(&self) -> &NoteCollection<S> {
        &self.collection
    }

    pub fn session(&self) -> &SessionLock {
        &self.session
    }

    pub fn query(&self) -> &ViewQuery {
        &self.query
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn drawing(&self) -> &DrawingPad {
        &self.drawing
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn template(&self) -> Template {
        self.template
    }

    pub fn theme(&self) -> ThemeName {
        self.theme
    }

    pub fn preview_chars(&self) -> usize {
        self.preview_chars
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn pending_attachments(&self) -> &[Attachment] {
        &self.pending_attachments
    }

    pub fn rows(&self) -> Vec<NoteView<'_>> {
        view::project(
            self.collection.notes(),
            &self.query,
            self.session.is_unlocked(),
        )
    }

    pub fn current_row(&self) -> Option<NoteView<'_>> {
        self.rows().into_iter().nth(self.cursor)
    }

    pub fn all_visible_selected(&self) -> bool {
        let visible: Vec<NoteId> = self.rows().iter().map(|row| row.id).collect();
        self.selection.covers(&visible)
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = next as usize;
    }

    fn focus_note(&mut self, id: NoteId) {
        let position = self.rows().iter().position(|row| row.id == id);
        match position {
            Some(position) => self.cursor = position,
            None => self.normalize_cursor(),
        }
    }

    fn normalize_cursor(&mut self) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    pub fn set_status_message<M: Into<String>>(&mut self, message: Option<M>) {
        self.status_message = message.map(Into::into);
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut OverlayState> {
        self.overlay.as_mut()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn open_help(&mut self) {
        self.overlay = Some(OverlayState::Help);
    }

    // --- view controls ---

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn begin_search(&mut self) {
        self.search_active = true;
        self.set_status_message(Some("Search titles: type to filter • Enter keep • Esc clear"));
    }

    pub fn push_search_char(&mut self, ch: char) {
        self.query.search.push(ch);
        self.cursor = 0;
    }

    pub fn pop_search_char(&mut self) {
        self.query.search.pop();
        self.cursor = 0;
    }

    pub fn finish_search(&mut self) {
        self.search_active = false;
        self.set_status_message(None::<String>);
    }

    pub fn cancel_search(&mut self) {
        self.search_active = false;
        self.query.search.clear();
        self.normalize_cursor();
        self.set_status_message(None::<String>);
    }

    pub fn cycle_sort(&mut self) -> SortOrder {
        self.query.sort = self.query.sort.next();
        self.cursor = 0;
        self.query.sort
    }

    pub fn toggle_favorites_filter(&mut self) -> bool {
        self.query.favorites_only = !self.query.favorites_only;
        self.normalize_cursor();
        self.query.favorites_only
    }

    pub fn toggle_theme(&mut self) -> Result<ThemeName> {
        let next = self.theme.toggled();
        save_theme(self.collection.store(), next)?;
        self.theme = next;
        Ok(next)
    }

    // --- selection and deletion ---

    pub fn toggle_current_selected(&mut self) -> Option<bool> {
        let id = self.current_row()?.id;
        Some(self.selection.toggle(id))
    }

    /// Checks every visible row, or clears them all when they already are.
    pub fn toggle_select_all(&mut self) -> bool {
        let visible: Vec<NoteId> = self.rows().iter().map(|row| row.id).collect();
        if self.selection.covers(&visible) {
            self.selection.clear();
            false
        } else {
            self.selection.select_all(visible);
            !self.selection.is_empty()
        }
    }

    pub fn request_delete_selected(&mut self) {
        if self.selection.is_empty() {
            self.set_status_message(Some("Select notes to delete first"));
            return;
        }
        self.overlay = Some(OverlayState::ConfirmDelete(ConfirmDeleteOverlay {
            ids: self.selection.ids(),
        }));
    }

    pub fn request_delete_current(&mut self) {
        let Some(id) = self.current_row().map(|row| row.id) else {
            self.set_status_message(Some("No note selected"));
            return;
        };
        self.overlay = Some(OverlayState::ConfirmDelete(ConfirmDeleteOverlay { ids: vec![id] }));
    }

    pub fn confirm_delete(&mut self) -> Result<usize> {
        let Some(OverlayState::ConfirmDelete(pending)) = self.overlay.take() else {
            return Ok(0);
        };
        let removed = self.collection.delete_ids(&pending.ids)?;
        let collection = &self.collection;
        self.selection
            .retain_existing(|id| collection.index_of(id).is_some());
        self.normalize_cursor();
        self.set_status_message(Some(format!("Deleted {removed} note(s)")));
        Ok(removed)
    }

    // --- per-note toggles ---

    pub fn toggle_favorite_current(&mut self) -> Result<()> {
        let Some((index, id)) = self.current_row().map(|row| (row.original_index, row.id)) else {
            return Ok(());
        };
        if let Some(favorite) = self.collection.toggle_favorite(index)? {
            self.focus_note(id);
            let message = if favorite {
                "Added to favorites"
            } else {
                "Removed from favorites"
            };
            self.set_status_message(Some(message));
        }
        Ok(())
    }

    /// Locking needs an unlocked session; otherwise the unlock prompt opens.
    pub fn toggle_lock_current(&mut self) -> Result<()> {
        let Some(index) = self.current_row().map(|row| row.original_index) else {
            return Ok(());
        };
        match self.collection.toggle_lock(index, &self.session) {
            Ok(Some(true)) => self.set_status_message(Some("Note locked")),
            Ok(Some(false)) => self.set_status_message(Some("Note unlocked")),
            Ok(None) => {}
            Err(CollectionError::SessionLocked) => {
                self.begin_unlock()?;
                self.set_status_message(Some("Unlock the session before locking notes"));
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    /// Opens the note under the cursor; a redacted row starts the unlock flow.
    pub fn open_current(&mut self) -> Result<()> {
        let Some(row) = self.current_row() else {
            return Ok(());
        };
        let (index, id, locked) = (row.original_index, row.id, row.locked_for_display);
        if locked {
            return self.begin_unlock();
        }
        match self.collection.open(index, &self.session) {
            Ok(Some(_)) => {
                self.overlay = Some(OverlayState::ViewNote(ViewNoteOverlay {
                    note_id: id,
                    attachment_cursor: 0,
                }));
                self.focus_note(id);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(CollectionError::SessionLocked) => self.begin_unlock(),
            Err(err) => Err(err.into()),
        }
    }

    pub fn viewed_note_id(&self) -> Option<NoteId> {
        match &self.overlay {
            Some(OverlayState::ViewNote(view)) => Some(view.note_id),
            _ => None,
        }
    }

    pub fn move_attachment_cursor(&mut self, delta: isize) {
        let Some(OverlayState::ViewNote(view)) = &mut self.overlay else {
            return;
        };
        let len = self
            .collection
            .find(view.note_id)
            .map(|note| note.attachments.len())
            .unwrap_or(0);
        if len == 0 {
            view.attachment_cursor = 0;
            return;
        }
        let next = (view.attachment_cursor as isize + delta).clamp(0, len as isize - 1);
        view.attachment_cursor = next as usize;
    }

    /// Switches the open note into the edit form.
    pub fn begin_edit(&mut self) {
        let Some(note) = self.viewed_note_id().and_then(|id| self.collection.find(id)) else {
            return;
        };
        let body = if note.is_handwriting() {
            String::new()
        } else {
            source_from_markup(&note.content)
        };
        self.overlay = Some(OverlayState::Compose(ComposeOverlay {
            editing: Some(note.id),
            kind: note.kind,
            title: TextBuffer::single_line(note.title.clone()),
            body: TextBuffer::multi_line(body.clone()),
            field: ComposeField::Title,
            original_body: body,
        }));
        self.set_status_message(Some("Edit note: Tab switch field • Ctrl-s save • Esc cancel"));
    }

    // --- composing ---

    pub fn begin_compose(&mut self) {
        let kind = match self.mode {
            EditorMode::Text => NoteKind::Text,
            EditorMode::Handwriting => NoteKind::Handwriting,
        };
        self.overlay = Some(OverlayState::Compose(ComposeOverlay {
            editing: None,
            kind,
            title: TextBuffer::single_line(""),
            body: TextBuffer::multi_line(""),
            field: ComposeField::Title,
            original_body: String::new(),
        }));
        let hint = match kind {
            NoteKind::Text => "New note: Tab switch field • Ctrl-s save • Esc cancel",
            NoteKind::Handwriting => "Name the drawing: Enter save • Esc cancel",
        };
        self.set_status_message(Some(hint));
    }

    pub fn compose_push_char(&mut self, ch: char) {
        if let Some(OverlayState::Compose(compose)) = &mut self.overlay {
            let at_title = compose.field == ComposeField::Title;
            let buffer = compose.active_buffer_mut();
            if at_title && buffer.as_str().chars().count() >= MAX_TITLE_LEN {
                return;
            }
            buffer.insert_char(ch);
        }
    }

    /// Saves the compose overlay. Validation failures keep it open.
    pub fn submit_compose(&mut self) -> Result<()> {
        let Some(OverlayState::Compose(compose)) = self.overlay.clone() else {
            return Ok(());
        };
        match compose.editing {
            Some(id) => self.save_edit(id, &compose),
            None => self.save_new(&compose),
        }
    }

    fn save_edit(&mut self, id: NoteId, compose: &ComposeOverlay) -> Result<()> {
        let Some(index) = self.collection.index_of(id) else {
            self.close_overlay();
            return Ok(());
        };
        let title = compose.title.as_str().trim();
        if title.is_empty() {
            self.set_status_message(Some("Title cannot be empty"));
            return Ok(());
        }
        let content = match compose.kind {
            NoteKind::Text if compose.body.as_str() != compose.original_body => {
                Some(markup_from_source(compose.body.as_str()))
            }
            NoteKind::Text | NoteKind::Handwriting => None,
        };
        self.collection.update(
            index,
            NoteUpdate {
                title: Some(title.to_string()),
                content,
            },
        )?;
        self.close_overlay();
        self.focus_note(id);
        self.set_status_message(Some("Note updated"));
        Ok(())
    }

    fn save_new(&mut self, compose: &ComposeOverlay) -> Result<()> {
        let draft = match compose.kind {
            NoteKind::Text => NoteDraft::text(
                compose.title.as_str(),
                markup_from_source(compose.body.as_str()),
            ),
            NoteKind::Handwriting => {
                NoteDraft::handwriting(compose.title.as_str(), self.drawing.canvas().to_data_uri()?)
            }
        }
        .with_template(self.template)
        .with_attachments(self.pending_attachments.clone());

        match self.collection.add(draft) {
            Ok(id) => {
                if compose.kind == NoteKind::Handwriting {
                    self.drawing.clear(true);
                }
                self.pending_attachments.clear();
                self.selection.clear();
                self.close_overlay();
                self.focus_note(id);
                self.set_status_message(Some("Note saved"));
                Ok(())
            }
            Err(CollectionError::Validation(err)) => {
                self.set_status_message(Some(err.to_string()));
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn cycle_template(&mut self) -> Template {
        self.template = self.template.next();
        self.template
    }

    /// Switching into handwriting re-activates the surface at `canvas_size`.
    pub fn switch_mode(&mut self, mode: EditorMode, canvas_size: (u32, u32)) {
        self.mode = mode;
        if mode == EditorMode::Handwriting {
            self.drawing.activate(canvas_size.0, canvas_size.1);
        }
    }

    pub fn toggle_mode(&mut self, canvas_size: (u32, u32)) -> EditorMode {
        let next = match self.mode {
            EditorMode::Text => EditorMode::Handwriting,
            EditorMode::Handwriting => EditorMode::Text,
        };
        self.switch_mode(next, canvas_size);
        next
    }

    // --- drawing ---

    pub fn resize_canvas(&mut self, width: u32, height: u32) {
        self.drawing.resize(width, height);
    }

    pub fn pen_down(&mut self, x: i32, y: i32) {
        let ink = ink_for(self.template, self.theme);
        self.drawing.pen_down(x, y, ink);
    }

    pub fn pen_move(&mut self, x: i32, y: i32) {
        let ink = ink_for(self.template, self.theme);
        self.drawing.pen_move(x, y, ink);
    }

    pub fn pen_up(&mut self) {
        self.drawing.pen_up();
    }

    pub fn undo_drawing(&mut self) -> bool {
        self.drawing.undo()
    }

    pub fn redo_drawing(&mut self) -> bool {
        self.drawing.redo()
    }

    pub fn clear_drawing(&mut self) {
        self.drawing.clear(false);
    }

    // --- attachments ---

    pub fn begin_attach(&mut self, target: AttachTarget) {
        self.overlay = Some(OverlayState::Attach(AttachOverlay {
            target,
            path: TextBuffer::single_line(""),
        }));
        self.set_status_message(Some("Attach file: type a path • Enter attach • Esc cancel"));
    }

    /// Reads the typed path and attaches the file to its target.
    pub fn submit_attach(&mut self) -> Result<()> {
        let Some(OverlayState::Attach(attach)) = self.overlay.clone() else {
            return Ok(());
        };
        let raw = attach.path.as_str().trim();
        if raw.is_empty() {
            self.set_status_message(Some("Enter a file path"));
            return Ok(());
        }
        let attachment = match Attachment::from_file(Path::new(raw)) {
            Ok(attachment) => attachment,
            Err(err) => {
                tracing::warn!(?err, path = raw, "failed to read attachment");
                self.set_status_message(Some(format!("Could not read {raw}")));
                return Ok(());
            }
        };
        let name = attachment.name.clone();
        match attach.target {
            AttachTarget::Draft => {
                self.pending_attachments.push(attachment);
                self.close_overlay();
            }
            AttachTarget::Note(id) => {
                if let Some(index) = self.collection.index_of(id) {
                    self.collection.add_attachment(index, attachment)?;
                }
                self.overlay = Some(OverlayState::ViewNote(ViewNoteOverlay {
                    note_id: id,
                    attachment_cursor: 0,
                }));
            }
        }
        self.set_status_message(Some(format!("Attached {name}")));
        Ok(())
    }

    pub fn remove_pending_attachment(&mut self) -> Option<Attachment> {
        let removed = self.pending_attachments.pop();
        if let Some(attachment) = &removed {
            self.set_status_message(Some(format!("Removed {}", attachment.name)));
        }
        removed
    }

    pub fn remove_viewed_attachment(&mut self) -> Result<()> {
        let Some(OverlayState::ViewNote(view)) = &self.overlay else {
            return Ok(());
        };
        let (id, position) = (view.note_id, view.attachment_cursor);
        let Some(index) = self.collection.index_of(id) else {
            return Ok(());
        };
        if let Some(removed) = self.collection.remove_attachment(index, position)? {
            self.set_status_message(Some(format!("Removed {}", removed.name)));
        }
        self.move_attachment_cursor(0);
        Ok(())
    }

    /// Writes the highlighted attachment of the open note to the export directory.
    pub fn export_viewed_attachment(&mut self) -> Result<Option<PathBuf>> {
        let Some(OverlayState::ViewNote(view)) = &self.overlay else {
            return Ok(None);
        };
        let Some(attachment) = self
            .collection
            .find(view.note_id)
            .and_then(|note| note.attachments.get(view.attachment_cursor))
        else {
            return Ok(None);
        };
        let path = attachment.export_to(&self.export_dir)?;
        self.set_status_message(Some(format!("Saved {}", path.display())));
        Ok(Some(path))
    }

    // --- session ---

    pub fn begin_unlock(&mut self) -> Result<()> {
        let step = match self.session.begin_unlock(self.collection.store())? {
            UnlockStep::SetPassword => PasswordStep::New,
            UnlockStep::EnterPassword => PasswordStep::Existing,
        };
        self.overlay = Some(OverlayState::Password(PasswordOverlay::new(
            PasswordPurpose::Unlock,
            step,
        )));
        Ok(())
    }

    pub fn lock_session(&mut self) {
        self.session.lock();
        self.normalize_cursor();
        self.set_status_message(Some("Session locked"));
    }

    pub fn toggle_session(&mut self) -> Result<()> {
        if self.session.is_unlocked() {
            self.lock_session();
            Ok(())
        } else {
            self.begin_unlock()
        }
    }

    pub fn begin_change_password(&mut self) -> Result<()> {
        let step = if session::password_is_set(self.collection.store())? {
            PasswordStep::Current
        } else {
            PasswordStep::New
        };
        self.overlay = Some(OverlayState::Password(PasswordOverlay::new(
            PasswordPurpose::Change,
            step,
        )));
        Ok(())
    }

    /// Advances the password prompt by one answer. Any rejection closes the
    /// prompt; the user starts over.
    pub fn submit_password(&mut self) -> Result<()> {
        let Some(OverlayState::Password(mut prompt)) = self.overlay.take() else {
            return Ok(());
        };
        let answer = prompt.input.take();
        let store = self.collection.store();
        let outcome: Result<Option<&str>, SessionError> = match prompt.step {
            PasswordStep::Existing => self
                .session
                .unlock_with(store, &answer)
                .map(|()| Some("Session unlocked")),
            PasswordStep::Current => match session::check_password(store, &answer) {
                Ok(true) => {
                    prompt.old = Some(answer);
                    prompt.step = PasswordStep::New;
                    Ok(None)
                }
                Ok(false) => Err(SessionError::WrongPassword),
                Err(err) => Err(err.into()),
            },
            PasswordStep::New => {
                if answer.chars().count() < MIN_PASSWORD_CHARS {
                    Err(SessionError::TooShort)
                } else {
                    prompt.first = Some(answer);
                    prompt.step = PasswordStep::Confirm;
                    Ok(None)
                }
            }
            PasswordStep::Confirm => {
                let first = prompt.first.take().unwrap_or_default();
                match prompt.purpose {
                    PasswordPurpose::Unlock => self
                        .session
                        .set_password_and_unlock(store, &first, &answer)
                        .map(|()| Some("Password set, session unlocked")),
                    PasswordPurpose::Change => {
                        session::change_password(store, prompt.old.as_deref(), &first, &answer)
                            .map(|()| Some("Password changed"))
                    }
                }
            }
        };

        match outcome {
            Ok(Some(done)) => {
                self.normalize_cursor();
                self.set_status_message(Some(done));
            }
            Ok(None) => self.overlay = Some(OverlayState::Password(prompt)),
            Err(SessionError::Storage(err)) => return Err(err),
            Err(err) => self.set_status_message(Some(err.to_string())),
        }
        Ok(())
    }
}
