use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use image::DynamicImage;

use crate::input::TouchMachine;
use crate::page::{Chapter, Manifest, PageDescriptor};
use crate::preload::{LoadCompletion, LoadRequest, PreloadCache, PreloadConfig, PreloadStats};
use crate::size::{DEFAULT_ASPECT_RATIO, FitWidthOracle};
use crate::ui::ThumbnailCache;
use crate::viewer::{FitMode, Fullscreen, ReadingMode, ViewerStore};
use crate::virtualize::{FrameScheduler, ListEvent, VirtualList};

/// Approximate terminal cell size in screen pixels, used to translate
/// mouse positions into touch coordinates.
pub const CELL_WIDTH_PX: f64 = 8.0;
pub const CELL_HEIGHT_PX: f64 = 16.0;

/// Page width, in half-block pixels, for [`FitMode::Original`].
pub const ORIGINAL_WIDTH_PX: f64 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// Fullscreen for a terminal: hides the title line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalChrome {
    pub fullscreen: bool,
}

impl Fullscreen for TerminalChrome {
    fn apply(&mut self, fullscreen: bool) -> bool {
        self.fullscreen = fullscreen;
        self.fullscreen
    }
}

/// The complete application state.
pub struct Model {
    /// Path of the manifest being read
    pub manifest_path: PathBuf,
    /// Loaded series manifest
    pub manifest: Manifest,
    /// Index of the open chapter in `manifest.chapters`
    pub chapter: usize,
    /// Layout of the open chapter, in half-block pixels
    pub list: VirtualList,
    /// Decoded pages around the reading position
    pub cache: PreloadCache<Arc<DynamicImage>>,
    /// Reading position, UI flags, and persisted settings
    pub store: ViewerStore,
    /// Mouse presses interpreted as one-finger touches
    pub touch: TouchMachine,
    /// Terminal fullscreen hook
    pub chrome: TerminalChrome,
    /// Go-to-page prompt input, when open
    pub prompt: Option<String>,
    /// Whether manifest watching is enabled
    pub watch_enabled: bool,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Terminal size in cells
    pub terminal_size: (u16, u16),
    /// Scaled page bitmaps ready to paint
    pub thumbnails: ThumbnailCache,
    pub(super) frame: FrameScheduler,
    pending_loads: Vec<LoadRequest>,
    toast: Option<Toast>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("manifest_path", &self.manifest_path)
            .field("chapter", &self.chapter)
            .field("store", &self.store)
            .field("watch_enabled", &self.watch_enabled)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create a model with `chapter` open, falling back to the first one.
    pub fn new(
        manifest_path: PathBuf,
        manifest: Manifest,
        chapter: usize,
        terminal_size: (u16, u16),
    ) -> Self {
        let mut model = Self {
            manifest_path,
            manifest,
            chapter: 0,
            list: VirtualList::default(),
            cache: PreloadCache::default(),
            store: ViewerStore::default(),
            touch: TouchMachine::new(),
            chrome: TerminalChrome::default(),
            prompt: None,
            watch_enabled: false,
            should_quit: false,
            terminal_size,
            thumbnails: ThumbnailCache::default(),
            frame: FrameScheduler::default(),
            pending_loads: Vec::new(),
            toast: None,
        };
        model.sync_layout();
        if !model.open_chapter(chapter) {
            model.open_chapter(0);
        }
        model
    }

    /// Replace the settings store, re-laying out for the rehydrated settings.
    #[must_use]
    pub fn with_store(mut self, store: ViewerStore) -> Self {
        let total = self.list.len();
        self.store = store;
        self.store.begin_sequence(total);
        self.sync_layout();
        self.frame.request();
        self
    }

    #[must_use]
    pub fn with_preload_config(mut self, config: PreloadConfig) -> Self {
        self.cache = PreloadCache::new(config);
        self.frame.request();
        self
    }

    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.manifest.chapters.get(self.chapter)
    }

    /// Descriptor of the current page.
    ///
    /// Page turns set it immediately; plain scrolling updates it on the next
    /// frame from the page under the viewport midpoint.
    pub fn current_page(&self) -> Option<&PageDescriptor> {
        self.list
            .pages()
            .get(self.store.current_page().saturating_sub(1))
    }

    pub fn preload_stats(&self) -> PreloadStats {
        self.cache.stats()
    }

    /// Rows available for pages, matching [`crate::ui::split_screen`].
    pub fn page_rows(&self) -> u16 {
        let runtime = self.store.runtime();
        let area = ratatui::layout::Rect::new(0, 0, self.terminal_size.0, self.terminal_size.1);
        crate::ui::split_screen(area, runtime.fullscreen, runtime.controls_visible)
            .1
            .height
    }

    /// Open a chapter by index. Out-of-range indices are ignored.
    pub fn open_chapter(&mut self, index: usize) -> bool {
        let Some(chapter) = self.manifest.chapters.get(index) else {
            return false;
        };
        let pages = chapter.pages.clone();
        tracing::debug!(index, pages = pages.len(), "opening chapter");
        crate::perf::log_event(
            "chapter.open",
            format!("index={index} pages={}", pages.len()),
        );
        self.chapter = index;
        self.cache.cancel_all();
        self.cache.clear_cache();
        self.thumbnails.clear();
        self.store.begin_sequence(pages.len());
        self.list.set_sequence(pages);
        // A chapter opens on its first page even when short pages put a
        // later one under the midpoint.
        if !self.list.is_empty() {
            let focused = self.list.hold_current(0);
            self.hold_page(0, focused);
        }
        self.frame.request();
        true
    }

    /// Swap in a freshly loaded manifest, staying near the current spot.
    pub fn replace_manifest(&mut self, manifest: Manifest) {
        let page = self.store.current_page();
        self.manifest = manifest;
        let chapter = self.chapter.min(self.manifest.chapters.len().saturating_sub(1));
        self.open_chapter(chapter);
        if page > 1 {
            self.scroll_to_page(page);
        }
    }

    /// Apply the current terminal size and settings to the layout.
    pub fn sync_layout(&mut self) {
        let columns = f64::from(self.terminal_size.0);
        let viewport = f64::from(self.page_rows()) * 2.0;
        let settings = self.store.settings();
        let zoom = f64::from(settings.zoom) / 100.0;
        let base = match settings.fit_mode {
            FitMode::Width => columns,
            FitMode::Height => viewport / DEFAULT_ASPECT_RATIO,
            FitMode::Original => ORIGINAL_WIDTH_PX,
        };
        self.list.set_viewport_height(viewport);
        self.list.set_container_width((base * zoom).round().max(1.0));
        self.frame.request();
    }

    pub(super) const fn request_frame(&mut self) {
        self.frame.request();
    }

    /// Run coalesced layout work if a frame is due.
    pub(super) fn tick_frame(&mut self, now_ms: u64) -> bool {
        if self.frame.take_frame(now_ms) {
            self.run_frame();
            return true;
        }
        false
    }

    /// Recompute the mounted range and react to page and progress changes.
    ///
    /// Mounted pages are requested before the preload window so the pages
    /// on screen take the first load slots.
    pub fn run_frame(&mut self) {
        let _scope = crate::perf::scope("app.frame");
        let events = self.list.recompute();
        self.request_mounted();
        for event in events {
            match event {
                ListEvent::PageChanged(index) => {
                    self.store.set_current_page(index + 1);
                    let requests = self.cache.preload_around(self.list.pages(), index);
                    self.pending_loads.extend(requests);
                }
                ListEvent::ProgressChanged(progress) => {
                    self.store.set_progress(progress);
                    if progress >= 100.0 {
                        self.maybe_advance_chapter();
                    }
                }
            }
        }
        let cache = &self.cache;
        self.thumbnails.retain(|src| cache.is_cached(src));
        crate::perf::log_event(
            "layout.recompute",
            format!(
                "range={:?} scroll={:.0} total={:.0}",
                self.list.visible_range(),
                self.list.scroll_top(),
                self.list.total_height()
            ),
        );
    }

    fn mounted_pages(&self) -> Vec<PageDescriptor> {
        self.list
            .visible_range()
            .filter_map(|index| self.list.pages().get(index).cloned())
            .collect()
    }

    fn request_mounted(&mut self) {
        for page in self.mounted_pages() {
            let requests = self.cache.request(&page);
            self.pending_loads.extend(requests);
        }
    }

    fn maybe_advance_chapter(&mut self) {
        // A chapter shorter than the screen starts at 100%; only a scroll
        // to the end counts.
        if !self.store.settings().auto_next_chapter
            || !self.store.on_last_page()
            || self.list.scroll_top() <= 0.0
        {
            return;
        }
        let next = self.chapter + 1;
        if self.open_chapter(next) {
            let title = self
                .current_chapter()
                .map(|c| c.title.clone())
                .unwrap_or_default();
            self.show_toast(ToastLevel::Info, format!("Next chapter: {title}"));
        }
    }

    /// Loads the event loop must dispatch, oldest first.
    pub fn take_pending_loads(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.pending_loads)
    }

    /// Feed a finished load back into the cache and layout.
    pub fn finish_load(&mut self, completion: LoadCompletion) {
        let LoadCompletion { src, result } = completion;
        let decoded = result.as_ref().ok().cloned();
        if let Err(err) = &result {
            tracing::warn!(%src, %err, "page load failed");
        }
        let requests = self.cache.finish_load(&src, result);
        self.pending_loads.extend(requests);

        if let Some(image) = decoded {
            let indices: Vec<usize> = self
                .list
                .pages()
                .iter()
                .enumerate()
                .filter(|(_, page)| page.uses_src(&src))
                .map(|(index, _)| index)
                .collect();
            for index in indices {
                self.list
                    .measure_with(index, &FitWidthOracle, image.as_ref());
            }
        }
        self.frame.request();
    }

    /// Give failed pages on screen another chance.
    pub(super) fn retry_failed(&mut self) -> usize {
        let mut retried = 0;
        for page in self.mounted_pages() {
            if self.cache.forget_failure(&page.primary_src) {
                retried += 1;
                let requests = self.cache.request(&page);
                self.pending_loads.extend(requests);
            }
        }
        retried
    }

    /// Make `page` (one-based) current and scroll it onto the viewport
    /// midpoint.
    pub(super) fn scroll_to_page(&mut self, page: usize) {
        let Some(index) = page.checked_sub(1).filter(|&i| i < self.list.len()) else {
            return;
        };
        self.store.go_to_page(page);
        let focused = self.list.focus_index(index);
        self.hold_page(index, focused);
    }

    /// Scroll to the end of the strip and make the last page current.
    pub(super) fn scroll_to_bottom(&mut self) {
        let last = self.store.total_pages();
        self.store.go_to_page(last);
        let max = self.list.max_scroll();
        self.list.set_scroll_top(max);
        if let Some(index) = last.checked_sub(1) {
            let focused = self.list.hold_current(index);
            self.hold_page(index, focused);
        }
    }

    fn hold_page(&mut self, index: usize, focused: bool) {
        // Off the midpoint no PageChanged will arrive for this page.
        if !focused {
            let requests = self.cache.preload_around(self.list.pages(), index);
            self.pending_loads.extend(requests);
        }
        self.frame.request();
    }

    pub const fn reading_mode(&self) -> ReadingMode {
        self.store.settings().reading_mode
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    pub(super) fn reload_from_disk(&mut self) -> anyhow::Result<()> {
        let manifest = Manifest::load(&self.manifest_path)?;
        self.replace_manifest(manifest);
        Ok(())
    }
}

impl Default for Model {
    fn default() -> Self {
        Self {
            manifest_path: PathBuf::new(),
            manifest: Manifest {
                title: String::new(),
                chapters: Vec::new(),
            },
            chapter: 0,
            list: VirtualList::default(),
            cache: PreloadCache::default(),
            store: ViewerStore::default(),
            touch: TouchMachine::new(),
            chrome: TerminalChrome::default(),
            prompt: None,
            watch_enabled: false,
            should_quit: false,
            terminal_size: (80, 24),
            thumbnails: ThumbnailCache::default(),
            frame: FrameScheduler::default(),
            pending_loads: Vec::new(),
            toast: None,
        }
    }
}
