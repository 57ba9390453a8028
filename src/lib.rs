// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. preload::PreloadCache)
    clippy::module_name_repetitions
)]

//! # Tooncast
//!
//! A terminal webtoon reader built around a virtualized page strip.
//!
//! Tooncast reads a series manifest and shows its chapters with:
//! - Virtualized layout, so only pages near the viewport are mounted
//! - Prioritized, concurrency-bounded page preloading
//! - Persisted reader settings (zoom, fit, brightness, reading mode)
//! - Keyboard navigation and mouse clicks read as touch gestures
//! - Manifest watching for live reload
//!
//! ## Architecture
//!
//! Tooncast uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! The engine modules below never touch the terminal; the [`app`] and
//! [`ui`] modules host them in one.
//!
//! ## Modules
//!
//! - [`page`]: Page descriptors and the series manifest
//! - [`size`]: Page height estimation and measurement
//! - [`preload`]: Page prefetch cache and loader pool
//! - [`virtualize`]: Virtual list layout and frame scheduling
//! - [`viewer`]: Reader state and persisted settings
//! - [`input`]: Keyboard map and touch gesture machine
//! - [`app`]: Main application loop and state
//! - [`ui`]: Terminal UI components
//! - [`watcher`]: Manifest watching

pub mod app;
pub mod config;
pub mod input;
pub mod page;
pub mod perf;
pub mod preload;
pub mod size;
pub mod ui;
pub mod viewer;
pub mod virtualize;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::page::{Manifest, PageDescriptor};
    pub use crate::preload::{PreloadCache, PreloadConfig};
    pub use crate::viewer::ViewerStore;
    pub use crate::virtualize::VirtualList;
}
