use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use ratatui::Terminal;

use crate::collection::NoteCollection;
use crate::config::{AppConfig, ConfigPaths};
use crate::model::NoteKind;
use crate::view::InlineMark;
use crate::storage::StorageHandle;
use crate::ui::{self, ScreenLayout};

mod actions;
mod editor;
pub mod state;

use actions::{action_for_key, Action};
pub use editor::TextBuffer;
pub use state::{AppState, AttachTarget, ComposeField, EditorMode, OverlayState};

pub struct App {
    pub config: Arc<AppConfig>,
    state: AppState<StorageHandle>,
    list_state: ListState,
    screen: Rect,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, storage: StorageHandle, paths: &ConfigPaths) -> Result<Self> {
        let collection = NoteCollection::load(storage).context("loading notes")?;
        let state = AppState::new(collection, &config, paths.export_dir.clone())
            .context("building initial state")?;
        Ok(Self {
            config,
            state,
            list_state: ListState::default(),
            screen: Rect::default(),
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        match self.state.collection().store().run_wal_health_check() {
            Ok(stats) => tracing::debug!(?stats, "checkpointed store on exit"),
            Err(err) => tracing::warn!(?err, "store checkpoint failed"),
        }
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|frame| {
                    self.screen = frame.size();
                    ui::draw_app(frame, &self.state, &mut self.list_state);
                })
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(width, height) => {
                        self.screen = Rect::new(0, 0, width, height);
                        let (w, h) = self.layout().canvas_size();
                        self.state.resize_canvas(w, h);
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn layout(&self) -> ScreenLayout {
        ScreenLayout::new(self.screen)
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.is_search_active() {
            match key.code {
                KeyCode::Esc => self.state.cancel_search(),
                KeyCode::Enter => self.state.finish_search(),
                KeyCode::Backspace => self.state.pop_search_char(),
                KeyCode::Char(ch)
                    if !key.modifiers.intersects(
                        KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER,
                    ) =>
                {
                    self.state.push_search_char(ch)
                }
                _ => {}
            }
            return;
        }

        if let Some(action) = action_for_key(&key, self.state.mode()) {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        let result = match action {
            Action::Quit => {
                self.should_quit = true;
                Ok(())
            }
            Action::SelectNext => {
                self.state.move_cursor(1);
                Ok(())
            }
            Action::SelectPrevious => {
                self.state.move_cursor(-1);
                Ok(())
            }
            Action::OpenNote => self.state.open_current(),
            Action::NewNote => {
                self.state.begin_compose();
                Ok(())
            }
            Action::StartSearch => {
                self.state.begin_search();
                Ok(())
            }
            Action::CycleSort => {
                let sort = self.state.cycle_sort();
                self.state
                    .set_status_message(Some(format!("Sorted by {}", sort.label())));
                Ok(())
            }
            Action::ToggleFavoritesFilter => {
                let only = self.state.toggle_favorites_filter();
                let message = if only {
                    "Showing favorites only"
                } else {
                    "Showing all notes"
                };
                self.state.set_status_message(Some(message));
                Ok(())
            }
            Action::ToggleFavorite => self.state.toggle_favorite_current(),
            Action::ToggleLock => self.state.toggle_lock_current(),
            Action::ToggleSession => self.state.toggle_session(),
            Action::ChangePassword => self.state.begin_change_password(),
            Action::ToggleSelected => {
                self.state.toggle_current_selected();
                Ok(())
            }
            Action::ToggleSelectAll => {
                self.state.toggle_select_all();
                Ok(())
            }
            Action::DeleteSelected => {
                self.state.request_delete_selected();
                Ok(())
            }
            Action::DeleteNote => {
                self.state.request_delete_current();
                Ok(())
            }
            Action::ToggleTheme => self.state.toggle_theme().map(|theme| {
                self.state
                    .set_status_message(Some(format!("Theme: {theme}")));
            }),
            Action::ToggleMode => {
                let size = self.layout().canvas_size();
                let mode = self.state.toggle_mode(size);
                let message = match mode {
                    EditorMode::Text => "Text mode",
                    EditorMode::Handwriting => "Handwriting mode: drag with the mouse to draw",
                };
                self.state.set_status_message(Some(message));
                Ok(())
            }
            Action::CycleTemplate => {
                let template = self.state.cycle_template();
                self.state
                    .set_status_message(Some(format!("Template: {template}")));
                Ok(())
            }
            Action::AttachFile => {
                self.state.begin_attach(AttachTarget::Draft);
                Ok(())
            }
            Action::DropAttachment => {
                self.state.remove_pending_attachment();
                Ok(())
            }
            Action::UndoStroke => {
                if !self.state.undo_drawing() {
                    self.state.set_status_message(Some("Nothing to undo"));
                }
                Ok(())
            }
            Action::RedoStroke => {
                if !self.state.redo_drawing() {
                    self.state.set_status_message(Some("Nothing to redo"));
                }
                Ok(())
            }
            Action::ClearCanvas => {
                self.state.clear_drawing();
                Ok(())
            }
            Action::Help => {
                self.state.open_help();
                Ok(())
            }
        };
        if let Err(err) = result {
            tracing::error!(?err, ?action, "action failed");
            self.state
                .set_status_message(Some(format!("Failed: {err:#}")));
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.state.mode() != EditorMode::Handwriting || self.state.overlay().is_some() {
            return;
        }
        let point = self.layout().canvas_point(mouse.column, mouse.row);
        match (mouse.kind, point) {
            (MouseEventKind::Down(MouseButton::Left), Some((x, y))) => self.state.pen_down(x, y),
            (MouseEventKind::Drag(MouseButton::Left), Some((x, y))) => self.state.pen_move(x, y),
            (MouseEventKind::Up(MouseButton::Left), _) => self.state.pen_up(),
            // Leaving the surface mid-stroke ends the stroke.
            (MouseEventKind::Drag(MouseButton::Left), None) if self.state.drawing().is_drawing() => {
                self.state.pen_up()
            }
            _ => {}
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        let typing = !key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER);
        let result = match self.state.overlay_mut() {
            Some(OverlayState::Compose(compose)) => {
                match key.code {
                    KeyCode::Esc => {
                        self.state.close_overlay();
                        self.state.set_status_message(Some("Canceled"));
                    }
                    KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return self.report(|state| state.submit_compose());
                    }
                    KeyCode::Char(key_char @ ('b' | 'e' | 'u'))
                        if key.modifiers.contains(KeyModifiers::CONTROL) =>
                    {
                        let mark = match key_char {
                            'b' => InlineMark::Bold,
                            'e' => InlineMark::Italic,
                            _ => InlineMark::Underline,
                        };
                        compose.insert_mark(mark);
                    }
                    KeyCode::Tab | KeyCode::BackTab => compose.toggle_field(),
                    KeyCode::Enter => {
                        if compose.field == ComposeField::Title && compose.kind == NoteKind::Handwriting
                        {
                            return self.report(|state| state.submit_compose());
                        }
                        if !compose.active_buffer_mut().insert_newline() {
                            compose.toggle_field();
                        }
                    }
                    KeyCode::Backspace => {
                        compose.active_buffer_mut().backspace();
                    }
                    KeyCode::Delete => {
                        compose.active_buffer_mut().delete();
                    }
                    KeyCode::Left => {
                        compose.active_buffer_mut().move_left();
                    }
                    KeyCode::Right => {
                        compose.active_buffer_mut().move_right();
                    }
                    KeyCode::Home => compose.active_buffer_mut().move_home(),
                    KeyCode::End => compose.active_buffer_mut().move_end(),
                    KeyCode::Char(ch) if typing => self.state.compose_push_char(ch),
                    _ => {}
                }
                Ok(())
            }
            Some(OverlayState::ViewNote(view)) => {
                let note_id = view.note_id;
                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => {
                        self.state.close_overlay();
                        Ok(())
                    }
                    KeyCode::Char('e') => {
                        self.state.begin_edit();
                        Ok(())
                    }
                    KeyCode::Char('a') => {
                        self.state.begin_attach(AttachTarget::Note(note_id));
                        Ok(())
                    }
                    KeyCode::Char('j') | KeyCode::Down => {
                        self.state.move_attachment_cursor(1);
                        Ok(())
                    }
                    KeyCode::Char('k') | KeyCode::Up => {
                        self.state.move_attachment_cursor(-1);
                        Ok(())
                    }
                    KeyCode::Char('s') => self.state.export_viewed_attachment().map(|_| ()),
                    KeyCode::Char('x') => self.state.remove_viewed_attachment(),
                    _ => Ok(()),
                }
            }
            Some(OverlayState::Password(prompt)) => match key.code {
                KeyCode::Esc => {
                    self.state.close_overlay();
                    self.state.set_status_message(Some("Canceled"));
                    Ok(())
                }
                KeyCode::Enter => self.state.submit_password(),
                KeyCode::Backspace => {
                    prompt.input.backspace();
                    Ok(())
                }
                KeyCode::Char(ch) if typing => {
                    prompt.input.insert_char(ch);
                    Ok(())
                }
                _ => Ok(()),
            },
            Some(OverlayState::ConfirmDelete(_)) => match key.code {
                KeyCode::Esc | KeyCode::Char('n') => {
                    self.state.close_overlay();
                    self.state.set_status_message(Some("Delete canceled"));
                    Ok(())
                }
                KeyCode::Enter | KeyCode::Char('y') => self.state.confirm_delete().map(|_| ()),
                _ => Ok(()),
            },
            Some(OverlayState::Attach(attach)) => match key.code {
                KeyCode::Esc => {
                    let target = attach.target;
                    self.state.close_overlay();
                    if let AttachTarget::Note(_) = target {
                        self.state.set_status_message(Some("Attach canceled"));
                    }
                    Ok(())
                }
                KeyCode::Enter => self.state.submit_attach(),
                KeyCode::Backspace => {
                    attach.path.backspace();
                    Ok(())
                }
                KeyCode::Char(ch) if typing => {
                    attach.path.insert_char(ch);
                    Ok(())
                }
                _ => Ok(()),
            },
            Some(OverlayState::Help) => {
                self.state.close_overlay();
                Ok(())
            }
            None => return false,
        };
        if let Err(err) = result {
            tracing::error!(?err, "overlay action failed");
            self.state
                .set_status_message(Some(format!("Failed: {err:#}")));
        }
        true
    }

    fn report<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut AppState<StorageHandle>) -> Result<()>,
    {
        if let Err(err) = f(&mut self.state) {
            tracing::error!(?err, "overlay action failed");
            self.state
                .set_status_message(Some(format!("Failed: {err:#}")));
        }
        true
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
