//! Key bindings (normal and vim-style) and mouse-to-board translation.

use crate::hit::TouchEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Prev,
    Next,
    Up,
    Down,
    Confirm,
    Retry,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter) and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Retry,
        KeyCode::Left | KeyCode::Char('h') => Action::Prev,
        KeyCode::Right | KeyCode::Char('l' | 'n') => Action::Next,
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Confirm,
        _ => Action::None,
    }
}

/// A left press translated into board cells. Presses outside the board still map
/// (to coordinates off the board) so the hit margin applies at the edges.
pub fn mouse_to_touch(mouse: MouseEvent, board: Rect) -> Option<TouchEvent> {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(TouchEvent::new(
            i32::from(mouse.column) - i32::from(board.x),
            i32::from(mouse.row) - i32::from(board.y),
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_normal_and_vim_keys() {
        assert_eq!(key_to_action(key(KeyCode::Char('p'))), Action::Pause);
        assert_eq!(key_to_action(key(KeyCode::Esc)), Action::Quit);
        assert_eq!(key_to_action(key(KeyCode::Left)), Action::Prev);
        assert_eq!(key_to_action(key(KeyCode::Char('l'))), Action::Next);
        assert_eq!(key_to_action(key(KeyCode::Char('j'))), Action::Down);
        assert_eq!(key_to_action(key(KeyCode::Enter)), Action::Confirm);
        assert_eq!(key_to_action(key(KeyCode::Char('x'))), Action::None);
    }

    #[test]
    fn test_ctrl_c_quits_other_chords_ignored() {
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl('c')), Action::Quit);
        assert_eq!(key_to_action(ctrl('p')), Action::None);
    }

    #[test]
    fn test_left_press_maps_to_board_cells() {
        let board = Rect::new(5, 2, 40, 20);
        let touch = mouse_to_touch(mouse(MouseEventKind::Down(MouseButton::Left), 12, 9), board);
        assert_eq!(touch, Some(TouchEvent::new(7, 7)));
        let outside = mouse_to_touch(mouse(MouseEventKind::Down(MouseButton::Left), 4, 1), board);
        assert_eq!(outside, Some(TouchEvent::new(-1, -1)));
        assert_eq!(
            mouse_to_touch(mouse(MouseEventKind::Up(MouseButton::Left), 12, 9), board),
            None
        );
        assert_eq!(
            mouse_to_touch(mouse(MouseEventKind::Down(MouseButton::Right), 12, 9), board),
            None
        );
    }
}
