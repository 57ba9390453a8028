use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, Message, Model};
use crate::input::{Key, KeyDisposition, KeyboardMap, Point, TouchEvent};

use super::model::{CELL_HEIGHT_PX, CELL_WIDTH_PX};
use super::update::mirror;

impl App {
    pub(super) fn handle_event(event: &Event, model: &Model, now_ms: u64) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(*key, model),
            Event::Mouse(mouse) => Self::handle_mouse(*mouse, now_ms),
            Event::Resize(w, h) => {
                crate::perf::log_event("event.resize", format!("width={w} height={h}"));
                Some(Message::Resize(*w, *h))
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Message::Quit),
                KeyCode::Char('d') => Some(Message::ScreenDown),
                KeyCode::Char('u') => Some(Message::ScreenUp),
                _ => None,
            };
        }

        let prompt_open = model.prompt.is_some();
        let zoom = model.store.settings().zoom;
        if let Some(mapped) = map_key(key.code) {
            match KeyboardMap.handle(mapped, prompt_open, zoom) {
                KeyDisposition::Handled(intent) => {
                    let horizontal = matches!(key.code, KeyCode::Left | KeyCode::Right);
                    let intent = if horizontal && model.reading_mode().is_rtl() {
                        mirror(intent)
                    } else {
                        intent
                    };
                    return Some(Message::Intent(intent));
                }
                KeyDisposition::Ignored => {}
            }
        }

        if prompt_open {
            return Self::handle_prompt_key(key, model);
        }

        match key.code {
            KeyCode::Char('q') => Some(Message::Quit),
            KeyCode::Char('j') => Some(Message::ScrollBy(1)),
            KeyCode::Char('k') => Some(Message::ScrollBy(-1)),
            KeyCode::Char('g') | KeyCode::Char(':') => Some(Message::StartPrompt),
            KeyCode::Home => Some(Message::GoToTop),
            KeyCode::End | KeyCode::Char('G') => Some(Message::GoToBottom),
            KeyCode::Char('m') => Some(Message::CycleReadingMode),
            KeyCode::Char('w') => Some(Message::CycleFitMode),
            KeyCode::Char('b') => Some(Message::AdjustBrightness(-1)),
            KeyCode::Char('B') => Some(Message::AdjustBrightness(1)),
            KeyCode::Char('n') => Some(Message::TogglePageNumber),
            KeyCode::Char('a') => Some(Message::ToggleAutoNext),
            KeyCode::Char('R') => Some(Message::ResetSettings),
            KeyCode::Char('r') => Some(Message::RetryFailed),
            _ => None,
        }
    }

    fn handle_prompt_key(key: KeyEvent, model: &Model) -> Option<Message> {
        let current = model.prompt.clone().unwrap_or_default();
        match key.code {
            KeyCode::Esc => Some(Message::PromptCancel),
            KeyCode::Enter => Some(Message::PromptSubmit),
            KeyCode::Backspace => {
                let mut text = current;
                text.pop();
                Some(Message::PromptInput(text))
            }
            KeyCode::Char(c) if c.is_ascii_digit() => Some(Message::PromptInput(format!("{current}{c}"))),
            _ => None,
        }
    }

    pub(super) fn handle_mouse(mouse: MouseEvent, now_ms: u64) -> Option<Message> {
        let point = Point::new(
            f64::from(mouse.column) * CELL_WIDTH_PX,
            f64::from(mouse.row) * CELL_HEIGHT_PX,
        );
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => Some(Message::Touch(TouchEvent::Start {
                touches: vec![point],
                at_ms: now_ms,
            })),
            MouseEventKind::Up(MouseButton::Left) => Some(Message::Touch(TouchEvent::End {
                point,
                at_ms: now_ms,
            })),
            MouseEventKind::ScrollDown => Some(Message::ScrollBy(3)),
            MouseEventKind::ScrollUp => Some(Message::ScrollBy(-3)),
            _ => None,
        }
    }
}

fn map_key(code: KeyCode) -> Option<Key> {
    Some(match code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        _ => return None,
    })
}
