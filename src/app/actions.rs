use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::state::EditorMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    OpenNote,
    NewNote,
    StartSearch,
    CycleSort,
    ToggleFavoritesFilter,
    ToggleFavorite,
    ToggleLock,
    ToggleSession,
    ChangePassword,
    ToggleSelected,
    ToggleSelectAll,
    DeleteSelected,
    DeleteNote,
    ToggleTheme,
    ToggleMode,
    CycleTemplate,
    AttachFile,
    DropAttachment,
    UndoStroke,
    RedoStroke,
    ClearCanvas,
    Help,
}

fn plain(key: &KeyEvent) -> bool {
    !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

/// Main-screen bindings. Canvas keys only apply in handwriting mode.
pub fn action_for_key(key: &KeyEvent, mode: EditorMode) -> Option<Action> {
    let drawing = mode == EditorMode::Handwriting;
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) && drawing => {
            Some(Action::UndoStroke)
        }
        KeyCode::Char('y') if key.modifiers.contains(KeyModifiers::CONTROL) && drawing => {
            Some(Action::RedoStroke)
        }
        _ if !plain(key) => None,
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
        KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
        KeyCode::Enter => Some(Action::OpenNote),
        KeyCode::Char('n') => Some(Action::NewNote),
        KeyCode::Char('/') => Some(Action::StartSearch),
        KeyCode::Char('s') => Some(Action::CycleSort),
        KeyCode::Char('F') => Some(Action::ToggleFavoritesFilter),
        KeyCode::Char('f') => Some(Action::ToggleFavorite),
        KeyCode::Char('l') => Some(Action::ToggleLock),
        KeyCode::Char('L') => Some(Action::ToggleSession),
        KeyCode::Char('P') => Some(Action::ChangePassword),
        KeyCode::Char(' ') => Some(Action::ToggleSelected),
        KeyCode::Char('A') => Some(Action::ToggleSelectAll),
        KeyCode::Char('D') => Some(Action::DeleteSelected),
        KeyCode::Char('d') | KeyCode::Delete => Some(Action::DeleteNote),
        KeyCode::Char('T') => Some(Action::ToggleTheme),
        KeyCode::Char('m') | KeyCode::Tab => Some(Action::ToggleMode),
        KeyCode::Char('t') => Some(Action::CycleTemplate),
        KeyCode::Char('a') => Some(Action::AttachFile),
        KeyCode::Char('x') => Some(Action::DropAttachment),
        KeyCode::Char('u') if drawing => Some(Action::UndoStroke),
        KeyCode::Char('r') if drawing => Some(Action::RedoStroke),
        KeyCode::Char('c') if drawing => Some(Action::ClearCanvas),
        KeyCode::Char('?') => Some(Action::Help),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn canvas_keys_need_handwriting_mode() {
        let undo = key(KeyCode::Char('u'));
        assert_eq!(action_for_key(&undo, EditorMode::Text), None);
        assert_eq!(
            action_for_key(&undo, EditorMode::Handwriting),
            Some(Action::UndoStroke)
        );
        let ctrl_y = KeyEvent::new(KeyCode::Char('y'), KeyModifiers::CONTROL);
        assert_eq!(
            action_for_key(&ctrl_y, EditorMode::Handwriting),
            Some(Action::RedoStroke)
        );
    }

    #[test]
    fn modified_letters_are_ignored() {
        let alt_f = KeyEvent::new(KeyCode::Char('f'), KeyModifiers::ALT);
        assert_eq!(action_for_key(&alt_f, EditorMode::Text), None);
        let shifted = KeyEvent::new(KeyCode::Char('D'), KeyModifiers::SHIFT);
        assert_eq!(
            action_for_key(&shifted, EditorMode::Text),
            Some(Action::DeleteSelected)
        );
    }
}
