//! Viewer state: reading position, UI flags, and persisted settings.

mod persist;
mod settings;
mod state;

pub use persist::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use settings::{
    BRIGHTNESS_MAX, BRIGHTNESS_MIN, FitMode, ReadingMode, SettingsPatch, ViewerSettings,
    ZOOM_DEFAULT, ZOOM_DOUBLE_TAP, ZOOM_MAX, ZOOM_MIN, ZOOM_STEP, clamp_zoom,
};
pub use state::{Fullscreen, NoFullscreen, RuntimeState, SETTINGS_KEY, ViewerStore};
