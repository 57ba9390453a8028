use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, ToastLevel, update};
use crate::page::Manifest;
use crate::preload::ThreadedLoader;
use crate::viewer::{JsonFileStore, ViewerStore};
use crate::watcher::ManifestWatcher;

/// Poll interval while decodes are outstanding.
const LOADING_POLL_MS: u64 = 16;
const IDLE_POLL_MS: u64 = 250;

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be loaded, the terminal
    /// cannot be initialized, or the event loop hits an I/O failure.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        let manifest_scope = crate::perf::scope("app.load_manifest");
        let manifest = Manifest::load(&self.manifest_path)
            .with_context(|| format!("Failed to open {}", self.manifest_path.display()))?;
        drop(manifest_scope);

        let store = self.open_store();

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal: tooncast requires an interactive terminal")?;
        let size = terminal.size()?;
        drop(init_scope);

        let mut model = Model::new(
            self.manifest_path.clone(),
            manifest,
            self.start_chapter,
            (size.width, size.height),
        )
        .with_store(store)
        .with_preload_config(self.preload);
        model.watch_enabled = self.watch_enabled;
        if let Some(page) = self.start_page {
            model.scroll_to_page(page);
        }

        execute!(stdout(), EnableMouseCapture)?;
        let result = Self::event_loop(&mut terminal, &mut model);

        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();
        crate::perf::report();

        result
    }

    fn open_store(&self) -> ViewerStore {
        let Some(path) = self.state_path.as_ref() else {
            return ViewerStore::default();
        };
        match JsonFileStore::open(path) {
            Ok(store) => ViewerStore::open(Box::new(store)),
            Err(err) => {
                tracing::warn!("Settings unavailable, using defaults: {err}");
                ViewerStore::default()
            }
        }
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let start = Instant::now();
        let loader = ThreadedLoader::new();
        let mut watcher = if model.watch_enabled {
            match Self::make_manifest_watcher(model) {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    model.watch_enabled = false;
                    model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
                    None
                }
            }
        } else {
            None
        };
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            if Self::collect_loads(model, &loader) > 0 {
                needs_render = true;
            }

            if model.watch_enabled
                && watcher
                    .as_mut()
                    .is_some_and(ManifestWatcher::poll_reload)
            {
                *model = update(std::mem::take(model), Message::ManifestChanged);
                Self::handle_message_side_effects(model, &Message::ManifestChanged);
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            if model.tick_frame(now_ms) {
                needs_render = true;
            }
            let dispatched = Self::dispatch_loads(model, &loader);
            if dispatched > 0 {
                crate::perf::log_event(
                    "loader.batch",
                    format!("frame={frame_idx} dispatched={dispatched}"),
                );
            }

            let poll_ms = if needs_render {
                0
            } else if let Some(wait) = model.frame.wait_ms(now_ms) {
                wait
            } else if model.cache.in_flight_len() > 0 {
                LOADING_POLL_MS
            } else {
                IDLE_POLL_MS
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                if let Some(msg) = Self::handle_event(&event::read()?, model, event_ms) {
                    Self::apply(model, msg, frame_idx);
                    needs_render = true;
                }

                // Coalesce key repeat and wheel bursts into a single frame.
                let mut drained = 0_u32;
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    if let Some(msg) = Self::handle_event(&event::read()?, model, drain_ms) {
                        drained += 1;
                        Self::apply(model, msg, frame_idx);
                        needs_render = true;
                    }
                }
                if drained > 0 {
                    crate::perf::log_event(
                        "event.drain",
                        format!("frame={frame_idx} drained={drained}"),
                    );
                }
            }

            if needs_render {
                frame_idx += 1;
                let draw_start = Instant::now();
                terminal.draw(|frame| Self::view(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3} range={:?}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0,
                        model.list.visible_range(),
                    ),
                );
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }

    fn apply(model: &mut Model, msg: Message, frame_idx: u64) {
        crate::perf::log_event("event.message", format!("frame={frame_idx} msg={msg:?}"));
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        Self::handle_message_side_effects(model, &side_msg);
    }

    fn view(model: &mut Model, frame: &mut ratatui::Frame) {
        crate::ui::render(model, frame);
    }
}
