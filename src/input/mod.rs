//! Keyboard and touch interpretation.
//!
//! Both machines turn raw input into [`Intent`]s. They never touch the
//! cache or the layout; the host applies intents to the
//! [`ViewerStore`](crate::viewer::ViewerStore) and its navigation callbacks.

mod keyboard;
mod touch;

pub use keyboard::{Key, KeyDisposition, KeyboardMap};
pub use touch::{
    DOUBLE_TAP_WINDOW_MS, EDGE_ZONE_FRACTION, TAP_MAX_DURATION_MS, TAP_MAX_MOVEMENT_PX, Point,
    TouchEvent, TouchMachine, TouchPhase,
};

/// What the reader asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    NextPage,
    PrevPage,
    NextChapter,
    PrevChapter,
    ToggleFullscreen,
    ToggleControls,
    /// Absolute zoom, already clamped to the supported range.
    SetZoom(u16),
    Escape,
}
