use tracing::{debug, warn};

use super::persist::{KeyValueStore, MemoryStore};
use super::settings::{SettingsPatch, ViewerSettings};

/// Key under which [`ViewerSettings`] are persisted.
pub const SETTINGS_KEY: &str = "tooncast.viewer-settings";

/// Platform hook for entering and leaving fullscreen.
pub trait Fullscreen {
    /// Request the given state and report the state actually in effect.
    fn apply(&mut self, fullscreen: bool) -> bool;
}

/// A platform without fullscreen support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFullscreen;

impl Fullscreen for NoFullscreen {
    fn apply(&mut self, _fullscreen: bool) -> bool {
        false
    }
}

/// Per-chapter reading state. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeState {
    /// One-based position in the page sequence.
    pub current_page: usize,
    pub total_pages: usize,
    pub progress: f64,
    pub controls_visible: bool,
    pub fullscreen: bool,
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
            progress: 0.0,
            controls_visible: true,
            fullscreen: false,
        }
    }
}

/// Holds reading position, UI flags, and persisted settings.
///
/// All writes go through the named operations below. Navigation outside
/// `1..=total_pages` is silently ignored.
pub struct ViewerStore {
    settings: ViewerSettings,
    runtime: RuntimeState,
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for ViewerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerStore")
            .field("settings", &self.settings)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl Default for ViewerStore {
    fn default() -> Self {
        Self::open(Box::new(MemoryStore::new()))
    }
}

impl ViewerStore {
    /// Create a store, rehydrating settings from `store`.
    ///
    /// Missing or unreadable settings fall back to defaults.
    pub fn open(store: Box<dyn KeyValueStore>) -> Self {
        let settings = match store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<ViewerSettings>(&raw) {
                Ok(settings) => settings.clamped(),
                Err(err) => {
                    warn!("Ignoring malformed viewer settings: {err}");
                    ViewerSettings::default()
                }
            },
            Ok(None) => ViewerSettings::default(),
            Err(err) => {
                warn!("Failed to read viewer settings: {err}");
                ViewerSettings::default()
            }
        };
        Self {
            settings,
            runtime: RuntimeState::default(),
            store,
        }
    }

    pub const fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub const fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }

    pub const fn current_page(&self) -> usize {
        self.runtime.current_page
    }

    pub const fn total_pages(&self) -> usize {
        self.runtime.total_pages
    }

    /// Reset per-chapter state for a new page sequence.
    ///
    /// Settings survive. The fullscreen flag mirrors the platform and is
    /// left alone.
    pub fn begin_sequence(&mut self, total_pages: usize) {
        self.runtime = RuntimeState {
            total_pages,
            fullscreen: self.runtime.fullscreen,
            ..RuntimeState::default()
        };
    }

    /// Jump to a one-based page. Returns true when the page changed.
    pub fn set_current_page(&mut self, page: usize) -> bool {
        if page == 0 || page > self.runtime.total_pages || page == self.runtime.current_page {
            return false;
        }
        self.runtime.current_page = page;
        true
    }

    pub fn set_total_pages(&mut self, total_pages: usize) {
        self.runtime.total_pages = total_pages;
        self.runtime.current_page = self.runtime.current_page.clamp(1, total_pages.max(1));
    }

    pub fn set_progress(&mut self, progress: f64) {
        self.runtime.progress = progress.clamp(0.0, 100.0);
    }

    pub const fn toggle_controls(&mut self) {
        self.runtime.controls_visible = !self.runtime.controls_visible;
    }

    pub const fn set_controls_visible(&mut self, visible: bool) {
        self.runtime.controls_visible = visible;
    }

    /// Flip fullscreen through the platform and mirror what it reports.
    pub fn toggle_fullscreen(&mut self, platform: &mut dyn Fullscreen) -> bool {
        let requested = !self.runtime.fullscreen;
        self.runtime.fullscreen = platform.apply(requested);
        self.runtime.fullscreen
    }

    /// Apply a partial settings update and persist it.
    ///
    /// Returns true when anything changed.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> bool {
        let next = self.settings.patched(patch);
        if next == self.settings {
            return false;
        }
        self.settings = next;
        self.persist();
        true
    }

    pub fn reset_settings(&mut self) {
        self.settings = ViewerSettings::default();
        self.persist();
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.runtime.current_page + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        match self.runtime.current_page.checked_sub(1) {
            Some(page) => self.go_to_page(page),
            None => false,
        }
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        self.set_current_page(page)
    }

    /// Whether the reader is on the final page of the sequence.
    pub const fn on_last_page(&self) -> bool {
        self.runtime.total_pages > 0 && self.runtime.current_page == self.runtime.total_pages
    }

    fn persist(&mut self) {
        let encoded = match serde_json::to_string(&self.settings) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!("Failed to encode viewer settings: {err}");
                return;
            }
        };
        match self.store.set(SETTINGS_KEY, &encoded) {
            Ok(()) => debug!("persisted viewer settings"),
            Err(err) => warn!("Failed to persist viewer settings: {err}"),
        }
    }
}
