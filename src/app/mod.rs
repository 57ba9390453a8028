//! Terminal host and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: State transitions
//! - [`App::run`]: Main event loop with loading and rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{
    CELL_HEIGHT_PX, CELL_WIDTH_PX, Model, ORIGINAL_WIDTH_PX, TerminalChrome, ToastLevel,
};
pub use update::{BRIGHTNESS_STEP, Message, SCROLL_STEP_PX, update};

use std::path::PathBuf;

use crate::preload::PreloadConfig;

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    manifest_path: PathBuf,
    start_chapter: usize,
    start_page: Option<usize>,
    watch_enabled: bool,
    preload: PreloadConfig,
    state_path: Option<PathBuf>,
}

impl App {
    /// Create a new application for the given manifest.
    pub fn new(manifest_path: PathBuf) -> Self {
        Self {
            manifest_path,
            start_chapter: 0,
            start_page: None,
            watch_enabled: false,
            preload: PreloadConfig::default(),
            state_path: None,
        }
    }

    /// Open this chapter (zero-based) first.
    pub const fn with_chapter(mut self, chapter: usize) -> Self {
        self.start_chapter = chapter;
        self
    }

    /// Start on this page (one-based).
    pub const fn with_page(mut self, page: Option<usize>) -> Self {
        self.start_page = page;
        self
    }

    /// Enable or disable manifest watching.
    pub const fn with_watch(mut self, enabled: bool) -> Self {
        self.watch_enabled = enabled;
        self
    }

    pub const fn with_preload_config(mut self, config: PreloadConfig) -> Self {
        self.preload = config;
        self
    }

    /// Persist viewer settings in this file.
    pub fn with_state_path(mut self, path: Option<PathBuf>) -> Self {
        self.state_path = path;
        self
    }
}

#[cfg(test)]
mod tests;
