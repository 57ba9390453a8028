//! Key bindings.
//!
//! | Key                       | Intent                       |
//! |---------------------------|------------------------------|
//! | Down, Right, Space        | next page                    |
//! | Up, Left                  | previous page                |
//! | PageDown / PageUp         | next / previous page         |
//! | `]` / `[`                 | next / previous chapter      |
//! | `f`                       | toggle fullscreen            |
//! | `h`                       | toggle controls              |
//! | `+` `=` / `-` `_` / `0`   | zoom +10 / zoom -10 / 100    |
//! | Escape                    | host escape callback         |
//!
//! Nothing is handled while a text field has focus.

use super::Intent;
use crate::viewer::{ZOOM_DEFAULT, ZOOM_STEP, clamp_zoom};

/// Platform-neutral key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Space,
    Escape,
    Char(char),
}

/// Outcome of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The key produced an intent; the platform default must be suppressed.
    Handled(Intent),
    /// The key is not ours; let the platform act on it.
    Ignored,
}

impl KeyDisposition {
    pub const fn prevents_default(self) -> bool {
        matches!(self, Self::Handled(_))
    }

    pub const fn intent(self) -> Option<Intent> {
        match self {
            Self::Handled(intent) => Some(intent),
            Self::Ignored => None,
        }
    }
}

/// Maps key presses to intents.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyboardMap;

impl KeyboardMap {
    /// Interpret `key` given the current zoom.
    pub fn handle(self, key: Key, text_input_focused: bool, zoom: u16) -> KeyDisposition {
        if text_input_focused {
            return KeyDisposition::Ignored;
        }
        let intent = match key {
            Key::Down | Key::Right | Key::Space | Key::PageDown => Intent::NextPage,
            Key::Up | Key::Left | Key::PageUp => Intent::PrevPage,
            Key::Escape => Intent::Escape,
            Key::Char(c) => match c {
                ' ' => Intent::NextPage,
                '[' => Intent::PrevChapter,
                ']' => Intent::NextChapter,
                'f' => Intent::ToggleFullscreen,
                'h' => Intent::ToggleControls,
                '+' | '=' => Intent::SetZoom(clamp_zoom(i64::from(zoom) + i64::from(ZOOM_STEP))),
                '-' | '_' => Intent::SetZoom(clamp_zoom(i64::from(zoom) - i64::from(ZOOM_STEP))),
                '0' => Intent::SetZoom(ZOOM_DEFAULT),
                _ => return KeyDisposition::Ignored,
            },
        };
        KeyDisposition::Handled(intent)
    }
}
