//! Persisted reader preferences.

use serde::{Deserialize, Serialize};

pub const ZOOM_MIN: u16 = 50;
pub const ZOOM_MAX: u16 = 200;
pub const ZOOM_DEFAULT: u16 = 100;
pub const ZOOM_STEP: u16 = 10;
/// Zoom used by the double-tap toggle.
pub const ZOOM_DOUBLE_TAP: u16 = 150;

pub const BRIGHTNESS_MIN: u8 = 20;
pub const BRIGHTNESS_MAX: u8 = 100;

/// Clamp any zoom value into the supported range.
pub fn clamp_zoom(zoom: i64) -> u16 {
    let clamped = zoom.clamp(i64::from(ZOOM_MIN), i64::from(ZOOM_MAX));
    u16::try_from(clamped).unwrap_or(ZOOM_DEFAULT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingMode {
    /// One continuous vertical strip
    #[default]
    Webtoon,
    /// One page per screen, left to right
    Paged,
    /// One page per screen, right to left
    Rtl,
}

impl ReadingMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Webtoon => "webtoon",
            Self::Paged => "paged",
            Self::Rtl => "rtl",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Webtoon => Self::Paged,
            Self::Paged => Self::Rtl,
            Self::Rtl => Self::Webtoon,
        }
    }

    /// Whether page turns go right to left.
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Rtl)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    #[default]
    Width,
    Height,
    Original,
}

impl FitMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Width => "width",
            Self::Height => "height",
            Self::Original => "original",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Width => Self::Height,
            Self::Height => Self::Original,
            Self::Original => Self::Width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerSettings {
    pub reading_mode: ReadingMode,
    pub brightness: u8,
    pub zoom: u16,
    pub fit_mode: FitMode,
    pub show_page_number: bool,
    pub auto_next_chapter: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            reading_mode: ReadingMode::Webtoon,
            brightness: BRIGHTNESS_MAX,
            zoom: ZOOM_DEFAULT,
            fit_mode: FitMode::Width,
            show_page_number: true,
            auto_next_chapter: false,
        }
    }
}

impl ViewerSettings {
    /// Copy with every numeric field forced into its valid range.
    #[must_use]
    pub fn clamped(mut self) -> Self {
        self.zoom = clamp_zoom(i64::from(self.zoom));
        self.brightness = self.brightness.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX);
        self
    }

    /// Apply a partial update, returning the clamped result.
    #[must_use]
    pub fn patched(&self, patch: &SettingsPatch) -> Self {
        Self {
            reading_mode: patch.reading_mode.unwrap_or(self.reading_mode),
            brightness: patch.brightness.unwrap_or(self.brightness),
            zoom: patch.zoom.unwrap_or(self.zoom),
            fit_mode: patch.fit_mode.unwrap_or(self.fit_mode),
            show_page_number: patch.show_page_number.unwrap_or(self.show_page_number),
            auto_next_chapter: patch.auto_next_chapter.unwrap_or(self.auto_next_chapter),
        }
        .clamped()
    }
}

/// Partial settings update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub reading_mode: Option<ReadingMode>,
    pub brightness: Option<u8>,
    pub zoom: Option<u16>,
    pub fit_mode: Option<FitMode>,
    pub show_page_number: Option<bool>,
    pub auto_next_chapter: Option<bool>,
}

impl SettingsPatch {
    pub fn zoom(zoom: u16) -> Self {
        Self {
            zoom: Some(zoom),
            ..Self::default()
        }
    }

    pub fn brightness(brightness: u8) -> Self {
        Self {
            brightness: Some(brightness),
            ..Self::default()
        }
    }
}
