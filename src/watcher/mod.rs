//! Manifest watching for live chapter reload.
//!
//! Backed by `notify`. Events arrive on a channel and are coalesced so a
//! burst of writes from an editor or a sync tool yields one reload.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches a manifest file and reports when it settles after a change.
pub struct ManifestWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    dir: PathBuf,
    manifest: PathBuf,
    file_name: Option<OsString>,
    debounce: Duration,
    dirty_since: Option<Instant>,
}

impl ManifestWatcher {
    /// Start watching the directory holding `manifest`.
    ///
    /// # Errors
    /// Returns an error if the platform watcher cannot be created or the
    /// directory cannot be watched.
    pub fn new(manifest: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Event paths come back canonical.
        let manifest = manifest
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| manifest.as_ref().to_path_buf());
        let file_name = manifest.file_name().map(std::ffi::OsStr::to_os_string);
        let dir = parent_dir(&manifest);

        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            dir,
            manifest,
            file_name,
            debounce,
            dirty_since: None,
        })
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest
    }

    /// Drain pending events; true once a change has been quiet for the
    /// debounce interval.
    pub fn poll_reload(&mut self) -> bool {
        let mut touched = false;
        let mut seen = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            seen += 1;
            match event {
                Ok(ev) if self.concerns_manifest(&ev) => touched = true,
                Ok(_) => {}
                Err(err) => {
                    tracing::debug!(%err, "manifest watcher error");
                    crate::perf::log_event("watcher.error", err.to_string());
                }
            }
        }
        if seen > 0 {
            crate::perf::log_event(
                "watcher.poll",
                format!("events={seen} manifest_touched={touched}"),
            );
        }

        if touched {
            self.dirty_since = Some(Instant::now());
        }
        match self.dirty_since {
            Some(since) if since.elapsed() >= self.debounce => {
                self.dirty_since = None;
                true
            }
            _ => false,
        }
    }

    fn concerns_manifest(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.dir
                || path == &self.manifest
                || self
                    .file_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
