//! Opt-in timing and event tracing.
//!
//! `--perf` aggregates [`scope`] timings per name and prints a summary when
//! the reader exits. `--render-debug-log` appends timestamped layout and
//! loader events (and every finished scope) to a file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::virtualize::FRAME_INTERVAL_MS;

static ENABLED: AtomicBool = AtomicBool::new(false);
static RECORDER: LazyLock<Mutex<Recorder>> = LazyLock::new(|| Mutex::new(Recorder::new()));

/// Aggregate timings for one scope name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScopeStats {
    pub count: u64,
    pub total_ms: f64,
    pub max_ms: f64,
    /// Runs that took longer than one frame.
    pub over_budget: u64,
}

#[allow(clippy::cast_precision_loss)]
impl ScopeStats {
    pub fn mean_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }

    fn record(&mut self, elapsed_ms: f64) {
        self.count += 1;
        self.total_ms += elapsed_ms;
        self.max_ms = self.max_ms.max(elapsed_ms);
        if elapsed_ms > FRAME_INTERVAL_MS as f64 {
            self.over_budget += 1;
        }
    }
}

/// Times the enclosing block until dropped.
#[derive(Debug)]
#[must_use = "a scope measures until it is dropped"]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        let timing = is_enabled();
        let mut recorder = recorder();
        if !timing && recorder.log.is_none() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        if timing {
            recorder.stats.entry(self.name).or_default().record(elapsed_ms);
        }
        recorder.write(self.name, &format!("{elapsed_ms:.3} ms"));
    }
}

struct EventLog {
    start: Instant,
    writer: BufWriter<File>,
}

struct Recorder {
    stats: BTreeMap<&'static str, ScopeStats>,
    log: Option<EventLog>,
}

impl Recorder {
    const fn new() -> Self {
        Self {
            stats: BTreeMap::new(),
            log: None,
        }
    }

    fn write(&mut self, name: &str, detail: &str) {
        let Some(log) = self.log.as_mut() else {
            return;
        };
        let elapsed_ms = log.start.elapsed().as_secs_f64() * 1000.0;
        let _ = writeln!(log.writer, "[{elapsed_ms:>10.3} ms] {name}: {detail}");
        let _ = log.writer.flush();
    }
}

fn recorder() -> MutexGuard<'static, Recorder> {
    RECORDER.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Start (or stop, with `None`) the event log file.
///
/// # Errors
/// Returns an error when the file cannot be created or written.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut recorder = recorder();
    recorder.log = None;
    if let Some(path) = path {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "tooncast debug log start")?;
        writer.flush()?;
        recorder.log = Some(EventLog {
            start: Instant::now(),
            writer,
        });
    }
    Ok(())
}

pub fn is_debug_log_enabled() -> bool {
    recorder().log.is_some()
}

pub fn log_event(name: &str, detail: impl AsRef<str>) {
    recorder().write(name, detail.as_ref());
}

/// Timings gathered so far, by scope name.
pub fn summary() -> Vec<(&'static str, ScopeStats)> {
    recorder()
        .stats
        .iter()
        .map(|(name, stats)| (*name, *stats))
        .collect()
}

/// Print the timing summary to stderr when `--perf` is on.
pub fn report() {
    if !is_enabled() {
        return;
    }
    for (name, stats) in summary() {
        eprintln!(
            "[perf] {name}: n={} mean={:.2} ms max={:.2} ms slow={}",
            stats.count,
            stats.mean_ms(),
            stats.max_ms,
            stats.over_budget
        );
    }
}
