//! Per-frame coalescing of layout work.

/// Default frame interval, roughly one 60 Hz vsync.
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Runs queued work at most once per frame.
///
/// Scroll and resize handlers call [`request`](Self::request) as often as
/// events arrive; the loop calls [`take_frame`](Self::take_frame) and only
/// recomputes layout when it returns true.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval_ms: u64,
    pending: bool,
    last_frame_ms: Option<u64>,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(FRAME_INTERVAL_MS)
    }
}

impl FrameScheduler {
    pub const fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            pending: false,
            last_frame_ms: None,
        }
    }

    pub const fn request(&mut self) {
        self.pending = true;
    }

    /// Consume the pending request if a frame boundary has been reached.
    pub fn take_frame(&mut self, now_ms: u64) -> bool {
        if !self.pending {
            return false;
        }
        if self
            .last_frame_ms
            .is_some_and(|last| now_ms.saturating_sub(last) < self.interval_ms)
        {
            return false;
        }
        self.pending = false;
        self.last_frame_ms = Some(now_ms);
        true
    }

    pub const fn is_pending(&self) -> bool {
        self.pending
    }

    /// Milliseconds until pending work may run, if any is queued.
    pub fn wait_ms(&self, now_ms: u64) -> Option<u64> {
        if !self.pending {
            return None;
        }
        Some(self.last_frame_ms.map_or(0, |last| {
            self.interval_ms
                .saturating_sub(now_ms.saturating_sub(last))
        }))
    }
}
