use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Actions available while browsing the tab row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    PrevTab,
    NextTab,
    /// Activate the entry under the cursor. On the `[+]` pseudo-tab this
    /// opens the new-flow dialog instead of activating the tab.
    Activate,
    /// Delete the selected flow (publishes the retained empty payload).
    DeleteFlow,
    /// Restart connection attempts after backoff exhaustion.
    Retry,
    ClearError,
    None,
}

/// Map a key press in browse mode. Ctrl+C always quits.
pub fn map_key(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Quit;
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Left | KeyCode::Char('h') => Action::PrevTab,
        KeyCode::Right | KeyCode::Char('l') => Action::NextTab,
        KeyCode::Enter => Action::Activate,
        KeyCode::Char('d') | KeyCode::Char('x') => Action::DeleteFlow,
        KeyCode::Char('r') => Action::Retry,
        KeyCode::Esc => Action::ClearError,
        _ => Action::None,
    }
}

/// Keys understood by the new-flow dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogAction {
    Submit,
    Cancel,
    Backspace,
    Input(char),
    None,
}

/// Map a key press while the dialog is open. Enter submits, Esc cancels,
/// Backspace and Delete edit; anything else is offered to the name filter.
pub fn map_dialog_key(key: KeyEvent) -> DialogAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return DialogAction::Cancel;
    }

    match key.code {
        KeyCode::Enter => DialogAction::Submit,
        KeyCode::Esc => DialogAction::Cancel,
        KeyCode::Backspace | KeyCode::Delete => DialogAction::Backspace,
        KeyCode::Char(c) => DialogAction::Input(c),
        _ => DialogAction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_browse_mapping() {
        assert_eq!(map_key(key(KeyCode::Char('q'))), Action::Quit);
        assert_eq!(map_key(key(KeyCode::Left)), Action::PrevTab);
        assert_eq!(map_key(key(KeyCode::Char('l'))), Action::NextTab);
        assert_eq!(map_key(key(KeyCode::Enter)), Action::Activate);
        assert_eq!(map_key(key(KeyCode::Char('d'))), Action::DeleteFlow);
        assert_eq!(map_key(key(KeyCode::Char('z'))), Action::None);
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn test_dialog_mapping() {
        assert_eq!(map_dialog_key(key(KeyCode::Enter)), DialogAction::Submit);
        assert_eq!(map_dialog_key(key(KeyCode::Esc)), DialogAction::Cancel);
        assert_eq!(
            map_dialog_key(key(KeyCode::Backspace)),
            DialogAction::Backspace
        );
        assert_eq!(
            map_dialog_key(key(KeyCode::Delete)),
            DialogAction::Backspace
        );
        assert_eq!(
            map_dialog_key(key(KeyCode::Char('a'))),
            DialogAction::Input('a')
        );
    }
}
