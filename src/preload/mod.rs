//! Page prefetching.
//!
//! [`PreloadCache`] keeps a sliding window of decoded pages around the
//! reader's position. It never performs I/O itself: every operation returns
//! the [`LoadRequest`]s the host must dispatch, and the host reports each
//! result back through [`PreloadCache::finish_load`]. That keeps all cache
//! state on one thread with no locking.

mod loader;

pub use loader::{LoadCompletion, ThreadedLoader, load_page};

use std::collections::{HashMap, HashSet, VecDeque};

use thiserror::Error;
use tracing::debug;

use crate::page::PageDescriptor;

/// Tunables for a [`PreloadCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadConfig {
    /// Pages after the current one to keep warm.
    pub ahead: usize,
    /// Pages before the current one to keep warm.
    pub behind: usize,
    /// Upper bound on simultaneous loads.
    pub max_concurrent: usize,
    /// Soft cap on cached entries, enforced after each preload pass.
    pub capacity: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            ahead: 5,
            behind: 2,
            max_concurrent: 3,
            capacity: 50,
        }
    }
}

/// A load the host must start.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadRequest {
    pub src: String,
}

/// Why a single page load failed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to decode {src}: {source}")]
    Decode {
        src: String,
        #[source]
        source: image::ImageError,
    },
    #[error("no loader for {0}")]
    Unsupported(String),
    #[error("{0} is unavailable")]
    Unavailable(String),
}

/// Snapshot of cache bookkeeping, for status display and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreloadStats {
    pub cached: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
struct QueueItem {
    descriptor: PageDescriptor,
    priority: usize,
}

#[derive(Debug, Clone)]
enum Attempt {
    Primary { backup: Option<String> },
    Backup,
}

#[derive(Debug, Clone)]
struct InFlight {
    /// Primary source of the page; cache entries are keyed by it.
    key: String,
    attempt: Attempt,
}

/// Priority-ordered, concurrency-bounded page cache.
#[derive(Debug)]
pub struct PreloadCache<H> {
    config: PreloadConfig,
    entries: HashMap<String, H>,
    queue: VecDeque<QueueItem>,
    /// Keyed by the source actually requested (primary or backup).
    in_flight: HashMap<String, InFlight>,
    failed: HashSet<String>,
}

impl<H> Default for PreloadCache<H> {
    fn default() -> Self {
        Self::new(PreloadConfig::default())
    }
}

impl<H> PreloadCache<H> {
    pub fn new(config: PreloadConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    pub const fn config(&self) -> PreloadConfig {
        self.config
    }

    /// Warm the configured window around `current_index`.
    pub fn preload_around(
        &mut self,
        sequence: &[PageDescriptor],
        current_index: usize,
    ) -> Vec<LoadRequest> {
        let PreloadConfig { ahead, behind, .. } = self.config;
        self.preload_around_with(sequence, current_index, ahead, behind)
    }

    /// Warm `ahead` pages after and `behind` pages before `current_index`.
    ///
    /// Replaces any queued work, starts as many loads as the concurrency
    /// bound allows, and then evicts entries outside the keep-window if the
    /// cache has grown past its capacity.
    pub fn preload_around_with(
        &mut self,
        sequence: &[PageDescriptor],
        current_index: usize,
        ahead: usize,
        behind: usize,
    ) -> Vec<LoadRequest> {
        self.queue.clear();

        let ahead_items = (1..=ahead).filter_map(|i| {
            let index = current_index.checked_add(i)?;
            Some((index, i))
        });
        let behind_items = (1..=behind).filter_map(|i| {
            let index = current_index.checked_sub(i)?;
            Some((index, ahead + i))
        });
        for (index, priority) in ahead_items.chain(behind_items) {
            let Some(descriptor) = sequence.get(index) else {
                continue;
            };
            if self.entries.contains_key(&descriptor.primary_src)
                || self.is_loading(&descriptor.primary_src)
            {
                continue;
            }
            self.queue.push_back(QueueItem {
                descriptor: descriptor.clone(),
                priority,
            });
        }
        self.queue
            .make_contiguous()
            .sort_by_key(|item| item.priority);

        let requests = self.drain();

        if self.entries.len() > self.config.capacity {
            self.evict_outside(sequence, current_index, ahead, behind);
        }

        debug!(
            current_index,
            dispatched = requests.len(),
            queued = self.queue.len(),
            in_flight = self.in_flight.len(),
            cached = self.entries.len(),
            "preload pass"
        );
        requests
    }

    /// Ask for a mounted page that has no pixels yet.
    ///
    /// The page jumps ahead of every preload item but still waits for a
    /// free load slot.
    pub fn request(&mut self, descriptor: &PageDescriptor) -> Vec<LoadRequest> {
        let src = &descriptor.primary_src;
        if self.entries.contains_key(src) || self.is_loading(src) || self.failed.contains(src) {
            return Vec::new();
        }
        self.queue.retain(|item| item.descriptor.primary_src != *src);
        self.queue.push_front(QueueItem {
            descriptor: descriptor.clone(),
            priority: 0,
        });
        self.drain()
    }

    /// Report the outcome of a load the host dispatched.
    ///
    /// Returns the loads to start next. Results for sources that are no
    /// longer in flight (after [`clear_cache`](Self::clear_cache)) are
    /// dropped.
    pub fn finish_load(&mut self, src: &str, result: Result<H, LoadError>) -> Vec<LoadRequest> {
        let Some(flight) = self.in_flight.remove(src) else {
            debug!(src, "dropping result for load that is no longer tracked");
            return Vec::new();
        };

        match result {
            Ok(handle) => {
                self.entries.insert(flight.key, handle);
            }
            Err(err) => {
                if let Attempt::Primary {
                    backup: Some(backup),
                } = flight.attempt
                    && !self.in_flight.contains_key(&backup)
                {
                    debug!(src, backup = %backup, error = %err, "retrying with backup source");
                    self.in_flight.insert(
                        backup.clone(),
                        InFlight {
                            key: flight.key,
                            attempt: Attempt::Backup,
                        },
                    );
                    let mut requests = vec![LoadRequest { src: backup }];
                    requests.extend(self.drain());
                    return requests;
                }
                debug!(src, error = %err, "abandoning page");
                self.failed.insert(flight.key);
            }
        }

        self.drain()
    }

    /// Drop queued work. Loads already dispatched still land in the cache.
    pub fn cancel_all(&mut self) {
        self.queue.clear();
    }

    /// Forget everything, including in-flight bookkeeping and failures.
    pub fn clear_cache(&mut self) {
        self.entries.clear();
        self.queue.clear();
        self.in_flight.clear();
        self.failed.clear();
    }

    pub fn is_cached(&self, src: &str) -> bool {
        self.entries.contains_key(src)
    }

    pub fn get_cached(&self, src: &str) -> Option<&H> {
        self.entries.get(src)
    }

    /// Whether a load for the page keyed by `src` is outstanding.
    pub fn is_loading(&self, src: &str) -> bool {
        self.in_flight.contains_key(src) || self.in_flight.values().any(|f| f.key == src)
    }

    /// Whether both sources of the page keyed by `src` failed.
    pub fn is_failed(&self, src: &str) -> bool {
        self.failed.contains(src)
    }

    /// Allow a failed page to be requested again.
    pub fn forget_failure(&mut self, src: &str) -> bool {
        self.failed.remove(src)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> PreloadStats {
        PreloadStats {
            cached: self.entries.len(),
            queued: self.queue.len(),
            in_flight: self.in_flight.len(),
            failed: self.failed.len(),
        }
    }

    fn drain(&mut self) -> Vec<LoadRequest> {
        let mut requests = Vec::new();
        while self.in_flight.len() < self.config.max_concurrent {
            let Some(item) = self.queue.pop_front() else {
                break;
            };
            let src = item.descriptor.primary_src;
            if self.entries.contains_key(&src) || self.is_loading(&src) || self.failed.contains(&src)
            {
                continue;
            }
            self.in_flight.insert(
                src.clone(),
                InFlight {
                    key: src.clone(),
                    attempt: Attempt::Primary {
                        backup: item.descriptor.backup_src,
                    },
                },
            );
            debug!(src = %src, priority = item.priority, "dispatching load");
            requests.push(LoadRequest { src });
        }
        requests
    }

    fn evict_outside(
        &mut self,
        sequence: &[PageDescriptor],
        current_index: usize,
        ahead: usize,
        behind: usize,
    ) {
        let start = current_index.saturating_sub(behind);
        let end = current_index.saturating_add(ahead).min(sequence.len().saturating_sub(1));
        let keep: HashSet<&str> = sequence
            .get(start..=end)
            .unwrap_or_default()
            .iter()
            .map(|page| page.primary_src.as_str())
            .collect();

        let before = self.entries.len();
        self.entries.retain(|src, _| keep.contains(src.as_str()));
        debug!(
            evicted = before - self.entries.len(),
            kept = self.entries.len(),
            start,
            end,
            "evicted pages outside keep-window"
        );
    }
}
