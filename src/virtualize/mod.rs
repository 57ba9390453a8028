//! Virtualized vertical layout for long page sequences.
//!
//! [`VirtualList`] lays every page out on a virtual canvas using estimated
//! heights and reports which contiguous slice of pages must be mounted for
//! the current scroll position. Pages outside that slice only contribute
//! their estimated height to the total.
//!
//! # Example
//!
//! ```
//! use tooncast::page::PageDescriptor;
//! use tooncast::virtualize::VirtualList;
//!
//! let pages: Vec<_> = (0..100)
//!     .map(|i| PageDescriptor::new(format!("p{i}"), i + 1, format!("{i}.png")))
//!     .collect();
//! let mut list = VirtualList::new(pages, 100.0, 300.0);
//! list.recompute();
//! assert_eq!(list.visible_range(), 0..5);
//! assert_eq!(list.total_height(), 15_000.0);
//! ```

mod frame;

pub use frame::{FRAME_INTERVAL_MS, FrameScheduler};

use std::ops::Range;

use tracing::debug;

use crate::page::{MeasuredDimensions, PageDescriptor, PageId};
use crate::size::{SizeOracle, estimate};

/// Extra pages mounted above and below the strictly visible ones.
pub const DEFAULT_OVERSCAN: usize = 3;

/// A mounted page and its span on the virtual canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualItem {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl VirtualItem {
    pub fn size(&self) -> f64 {
        self.end - self.start
    }
}

/// Change notifications produced by [`VirtualList::recompute`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListEvent {
    /// The page under the viewport midpoint changed.
    PageChanged(usize),
    /// Scroll progress (0-100) changed.
    ProgressChanged(f64),
}

/// Layout and visibility state for one chapter's pages.
#[derive(Debug, Clone)]
pub struct VirtualList {
    pages: Vec<PageDescriptor>,
    measured: MeasuredDimensions,
    container_width: f64,
    viewport_height: f64,
    scroll_top: f64,
    overscan: usize,
    /// Prefix sums of item heights; `offsets[i]` is the start of item `i`
    /// and the last element is the total height.
    offsets: Vec<f64>,
    range: Range<usize>,
    reported_page: Option<usize>,
    reported_progress: Option<f64>,
}

impl Default for VirtualList {
    fn default() -> Self {
        Self::new(Vec::new(), 0.0, 0.0)
    }
}

impl VirtualList {
    pub fn new(pages: Vec<PageDescriptor>, container_width: f64, viewport_height: f64) -> Self {
        let mut list = Self {
            pages,
            measured: MeasuredDimensions::new(),
            container_width: container_width.max(0.0),
            viewport_height: viewport_height.max(0.0),
            scroll_top: 0.0,
            overscan: DEFAULT_OVERSCAN,
            offsets: Vec::new(),
            range: 0..0,
            reported_page: None,
            reported_progress: None,
        };
        list.relayout_from(0);
        list
    }

    #[must_use]
    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    /// Replace the page sequence and forget everything learned about the old one.
    pub fn set_sequence(&mut self, pages: Vec<PageDescriptor>) {
        self.pages = pages;
        self.measured = MeasuredDimensions::new();
        self.scroll_top = 0.0;
        self.range = 0..0;
        self.reported_page = None;
        self.reported_progress = None;
        self.relayout_from(0);
    }

    pub fn pages(&self) -> &[PageDescriptor] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn measured(&self) -> &MeasuredDimensions {
        &self.measured
    }

    pub const fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub const fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    pub const fn container_width(&self) -> f64 {
        self.container_width
    }

    pub fn total_height(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Largest valid scroll offset.
    pub fn max_scroll(&self) -> f64 {
        (self.total_height() - self.viewport_height).max(0.0)
    }

    /// Span of item `index` on the virtual canvas.
    pub fn item(&self, index: usize) -> Option<VirtualItem> {
        if index >= self.pages.len() {
            return None;
        }
        Some(VirtualItem {
            index,
            start: self.offsets[index],
            end: self.offsets[index + 1],
        })
    }

    /// Mounted range from the last [`recompute`](Self::recompute).
    pub fn visible_range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Mounted items from the last [`recompute`](Self::recompute).
    pub fn virtual_items(&self) -> Vec<VirtualItem> {
        self.range.clone().filter_map(|i| self.item(i)).collect()
    }

    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.clamp(0.0, self.max_scroll());
    }

    pub fn scroll_by(&mut self, delta: f64) {
        self.set_scroll_top(self.scroll_top + delta);
    }

    /// Align the start of item `index` with the top of the viewport.
    pub fn scroll_to_index(&mut self, index: usize) {
        if let Some(item) = self.item(index) {
            self.set_scroll_top(item.start);
        }
    }

    /// Scroll so item `index` holds the viewport midpoint.
    ///
    /// Items taller than the viewport are aligned to the top; shorter ones
    /// are centered. Returns [`hold_current`](Self::hold_current) for the
    /// resulting position.
    pub fn focus_index(&mut self, index: usize) -> bool {
        let Some(item) = self.item(index) else {
            return false;
        };
        let half = self.viewport_height / 2.0;
        self.set_scroll_top(item.start + item.size().min(self.viewport_height) / 2.0 - half);
        self.hold_current(index)
    }

    /// Whether item `index` holds the viewport midpoint.
    ///
    /// When it does not (the scroll is clamped at either end of the strip),
    /// the item under the midpoint is marked as already reported so the next
    /// [`recompute`](Self::recompute) does not replace `index` as the
    /// current page.
    pub fn hold_current(&mut self, index: usize) -> bool {
        let current = self.current_index();
        if current == Some(index) {
            return true;
        }
        self.reported_page = current;
        false
    }

    pub fn set_viewport_height(&mut self, viewport_height: f64) {
        self.viewport_height = viewport_height.max(0.0);
        self.set_scroll_top(self.scroll_top);
    }

    /// Change the layout width, keeping the reader on the same spot of the
    /// page at the top of the viewport.
    pub fn set_container_width(&mut self, container_width: f64) {
        let container_width = container_width.max(0.0);
        if (container_width - self.container_width).abs() < f64::EPSILON {
            return;
        }
        let anchor = self.index_at(self.scroll_top).and_then(|i| self.item(i)).map(|item| {
            let fraction = if item.size() > 0.0 {
                (self.scroll_top - item.start) / item.size()
            } else {
                0.0
            };
            (item.index, fraction)
        });

        self.container_width = container_width;
        self.relayout_from(0);

        if let Some((index, fraction)) = anchor
            && let Some(item) = self.item(index)
        {
            self.set_scroll_top(item.start + fraction * item.size());
        } else {
            self.set_scroll_top(self.scroll_top);
        }
    }

    /// Record the natural size of a page once its image has decoded.
    ///
    /// Returns true when the layout changed.
    pub fn record_dimensions(&mut self, id: &PageId, width: f64, height: f64) -> bool {
        if !self.measured.record(id, width, height) {
            return false;
        }
        let indices: Vec<usize> = self
            .pages
            .iter()
            .enumerate()
            .filter(|(_, page)| page.id == *id)
            .map(|(i, _)| i)
            .collect();
        indices
            .into_iter()
            .fold(false, |changed, index| self.reflow_item(index) || changed)
    }

    /// Record the rendered height of a mounted item at the current width.
    pub fn apply_rendered_height(&mut self, index: usize, height: f64) -> bool {
        let Some(id) = self.pages.get(index).map(|page| page.id.clone()) else {
            return false;
        };
        if !height.is_finite() || height < 0.0 {
            return false;
        }
        self.measured.record(&id, self.container_width, height);
        self.reflow_item(index)
    }

    /// Measure a mounted item through a platform oracle.
    ///
    /// Items that cannot be measured keep their estimate.
    pub fn measure_with<H, O: SizeOracle<H>>(&mut self, index: usize, oracle: &O, handle: &H) -> bool {
        match oracle.measure(handle, self.container_width) {
            Some(height) => self.apply_rendered_height(index, height),
            None => {
                debug!(index, "item not measurable yet, keeping estimate");
                false
            }
        }
    }

    /// Recompute the mounted range, current page, and progress.
    ///
    /// Returns the notifications whose values changed since the last call.
    pub fn recompute(&mut self) -> Vec<ListEvent> {
        self.range = self.compute_range();

        let mut events = Vec::new();
        let page = self.current_index();
        if page != self.reported_page {
            self.reported_page = page;
            if let Some(index) = page {
                events.push(ListEvent::PageChanged(index));
            }
        }
        let progress = self.progress();
        if self
            .reported_progress
            .is_none_or(|last| (last - progress).abs() > f64::EPSILON)
        {
            self.reported_progress = Some(progress);
            events.push(ListEvent::ProgressChanged(progress));
        }
        events
    }

    /// Index of the item containing the viewport midpoint.
    ///
    /// A midpoint exactly on a boundary belongs to the earlier item.
    pub fn current_index(&self) -> Option<usize> {
        if self.pages.is_empty() {
            return None;
        }
        let midpoint = self.scroll_top + self.viewport_height / 2.0;
        Some(
            self.index_at(midpoint)
                .unwrap_or(self.pages.len() - 1),
        )
    }

    /// Share of the content that has been scrolled into view, 0-100.
    pub fn progress(&self) -> f64 {
        let total = self.total_height();
        if total <= 0.0 {
            return 100.0;
        }
        (100.0 * (self.scroll_top + self.viewport_height) / total).clamp(0.0, 100.0)
    }

    /// First item whose span reaches `offset` (inclusive end).
    fn index_at(&self, offset: f64) -> Option<usize> {
        let ends = self.offsets.get(1..)?;
        let index = ends.partition_point(|&end| end < offset);
        (index < self.pages.len()).then_some(index)
    }

    fn compute_range(&self) -> Range<usize> {
        let len = self.pages.len();
        if len == 0 {
            return 0..0;
        }
        let top = self.scroll_top;
        let bottom = top + self.viewport_height;

        let first = self.offsets[1..]
            .partition_point(|&end| end <= top)
            .min(len - 1);
        let starts_before_bottom = self.offsets[..len].partition_point(|&start| start < bottom);
        let last = starts_before_bottom.saturating_sub(1).max(first);

        first.saturating_sub(self.overscan)..(last + self.overscan + 1).min(len)
    }

    fn estimate_at(&self, index: usize) -> f64 {
        estimate(&self.pages[index], &self.measured, self.container_width)
    }

    fn relayout_from(&mut self, index: usize) {
        let len = self.pages.len();
        if self.offsets.len() != len + 1 || index == 0 {
            self.offsets.clear();
            self.offsets.reserve(len + 1);
            self.offsets.push(0.0);
            for i in 0..len {
                let next = self.offsets[i] + self.estimate_at(i);
                self.offsets.push(next);
            }
            return;
        }
        for i in index..len {
            self.offsets[i + 1] = self.offsets[i] + self.estimate_at(i);
        }
    }

    /// Re-derive offsets after item `index` changed size.
    ///
    /// When the item starts above the viewport, the scroll position moves
    /// by the same delta so the visible content stays put.
    fn reflow_item(&mut self, index: usize) -> bool {
        let Some(before) = self.item(index) else {
            return false;
        };
        self.relayout_from(index);
        let Some(after) = self.item(index) else {
            return false;
        };
        let delta = after.size() - before.size();
        if delta.abs() < f64::EPSILON {
            return false;
        }
        if before.start < self.scroll_top {
            self.scroll_top += delta;
        }
        self.set_scroll_top(self.scroll_top);
        debug!(index, delta, total = self.total_height(), "item resized");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(n: usize) -> Vec<PageDescriptor> {
        (0..n)
            .map(|i| {
                PageDescriptor::new(format!("p{i}"), u32::try_from(i + 1).unwrap(), format!("{i}.png"))
                    .with_intrinsic_size(800.0, 1200.0)
            })
            .collect()
    }

    /// 100 pages of height 150 in a 300 tall viewport.
    fn list() -> VirtualList {
        let mut list = VirtualList::new(pages(100), 100.0, 300.0);
        list.recompute();
        list
    }

    #[test]
    fn test_total_height_sums_estimates() {
        let list = VirtualList::new(pages(10), 900.0, 800.0);
        assert!((list.total_height() - 13_500.0).abs() < 1e-9);
    }

    #[test]
    fn test_items_are_contiguous() {
        let list = list();
        for i in 0..99 {
            assert_eq!(list.item(i).unwrap().end, list.item(i + 1).unwrap().start);
        }
        assert!(list.item(100).is_none());
    }

    #[test]
    fn test_visible_range_at_top_includes_overscan_below() {
        let list = list();
        assert_eq!(list.visible_range(), 0..5);
    }

    #[test]
    fn test_visible_range_mounts_three_extra_items_each_side() {
        let mut list = list();
        list.set_scroll_top(1500.0);
        list.recompute();
        // Items 10 and 11 are strictly visible.
        assert_eq!(list.visible_range(), 7..15);
        let items = list.virtual_items();
        assert_eq!(items.first().unwrap().index, 7);
        assert_eq!(items.last().unwrap().index, 14);
    }

    #[test]
    fn test_visible_range_partial_items() {
        let mut list = list();
        list.set_scroll_top(1540.0);
        list.recompute();
        // 10 (partially), 11, 12 (partially)
        assert_eq!(list.visible_range(), 7..16);
    }

    #[test]
    fn test_visible_range_at_bottom_is_clamped() {
        let mut list = list();
        list.set_scroll_top(f64::MAX);
        list.recompute();
        assert_eq!(list.scroll_top(), 14_700.0);
        assert_eq!(list.visible_range(), 95..100);
    }

    #[test]
    fn test_current_page_uses_viewport_midpoint() {
        let mut list = list();
        list.set_scroll_top(1400.0);
        // midpoint 1550 lies in item 10 (1500..1650)
        assert_eq!(list.current_index(), Some(10));
    }

    #[test]
    fn test_current_page_boundary_resolves_to_earlier_item() {
        let mut list = list();
        list.set_scroll_top(1350.0);
        // midpoint 1500 is the boundary between items 9 and 10
        assert_eq!(list.current_index(), Some(9));
    }

    #[test]
    fn test_focus_index_puts_short_item_on_midpoint() {
        // 40 items of height 15 in a 300 tall viewport.
        let mut list = VirtualList::new(pages(40), 10.0, 300.0);
        list.recompute();
        for index in 20..24 {
            assert!(list.focus_index(index));
            assert_eq!(list.current_index(), Some(index));
            assert_eq!(list.recompute()[0], ListEvent::PageChanged(index));
        }

        // Items taller than the viewport keep their start at the top.
        let mut list = VirtualList::new(pages(100), 100.0, 100.0);
        assert!(list.focus_index(10));
        assert_eq!(list.scroll_top(), 1500.0);
    }

    #[test]
    fn test_focus_index_clamped_holds_target() {
        let mut list = VirtualList::new(pages(40), 10.0, 300.0);
        list.recompute();
        list.set_scroll_top(150.0);
        list.recompute();

        // Item 5 cannot reach the midpoint at scroll 0, which lies in item 9.
        assert!(!list.focus_index(5));
        assert_eq!(list.scroll_top(), 0.0);
        assert_eq!(list.current_index(), Some(9));
        let events = list.recompute();
        assert!(
            !events.iter().any(|e| matches!(e, ListEvent::PageChanged(_))),
            "{events:?}"
        );

        list.scroll_by(60.0);
        assert_eq!(list.recompute()[0], ListEvent::PageChanged(13));
    }

    #[test]
    fn test_recompute_reports_changes_only() {
        let mut list = VirtualList::new(pages(100), 100.0, 300.0);
        let events = list.recompute();
        assert_eq!(events, vec![ListEvent::PageChanged(0), ListEvent::ProgressChanged(2.0)]);
        assert!(list.recompute().is_empty());

        list.scroll_to_index(40);
        let events = list.recompute();
        assert!(events.contains(&ListEvent::PageChanged(40)));

        // Still inside page 40, only progress moves.
        list.scroll_by(-10.0);
        let events = list.recompute();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ListEvent::ProgressChanged(_)));
    }

    #[test]
    fn test_progress_reaches_100_at_bottom() {
        let mut list = list();
        list.scroll_to_index(99);
        assert!((list.progress() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_progress_short_sequence_is_complete() {
        let list = VirtualList::new(pages(1), 100.0, 1000.0);
        assert!((list.progress() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_sequence() {
        let mut list = VirtualList::new(Vec::new(), 100.0, 300.0);
        let events = list.recompute();
        assert_eq!(list.visible_range(), 0..0);
        assert_eq!(list.current_index(), None);
        assert_eq!(events, vec![ListEvent::ProgressChanged(100.0)]);
    }

    #[test]
    fn test_record_dimensions_shifts_following_items() {
        let mut list = list();
        assert!(list.record_dimensions(&PageId::new("p2"), 100.0, 400.0));
        assert_eq!(list.item(2).unwrap().size(), 400.0);
        assert_eq!(list.item(3).unwrap().start, 700.0);
        assert!((list.total_height() - 15_250.0).abs() < 1e-9);
        assert!(!list.record_dimensions(&PageId::new("p2"), 100.0, 400.0));
    }

    #[test]
    fn test_resize_above_viewport_keeps_reader_in_place() {
        let mut list = list();
        list.scroll_to_index(10);
        list.recompute();
        let before = list.current_index();

        list.record_dimensions(&PageId::new("p3"), 100.0, 250.0);
        assert_eq!(list.scroll_top(), 1600.0);
        assert_eq!(list.item(10).unwrap().start, list.scroll_top());
        list.recompute();
        assert_eq!(list.current_index(), before);
    }

    #[test]
    fn test_resize_below_viewport_does_not_scroll() {
        let mut list = list();
        list.scroll_to_index(10);
        list.record_dimensions(&PageId::new("p30"), 100.0, 900.0);
        assert_eq!(list.scroll_top(), 1500.0);
    }

    #[test]
    fn test_remeasure_keeps_visible_items_mounted() {
        let mut list = list();
        list.set_scroll_top(1500.0);
        list.recompute();
        let before = list.visible_range();
        list.apply_rendered_height(11, 90.0);
        list.recompute();
        let after = list.visible_range();
        assert!(after.start <= before.start + 1);
        assert!(after.contains(&10) && after.contains(&11));
    }

    struct Unmeasurable;

    impl SizeOracle<()> for Unmeasurable {
        fn measure(&self, _handle: &(), _container_width: f64) -> Option<f64> {
            None
        }
    }

    struct Fixed(f64);

    impl SizeOracle<()> for Fixed {
        fn measure(&self, _handle: &(), _container_width: f64) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn test_measure_failure_keeps_estimate() {
        let mut list = list();
        assert!(!list.measure_with(4, &Unmeasurable, &()));
        assert_eq!(list.item(4).unwrap().size(), 150.0);
    }

    #[test]
    fn test_measure_with_oracle_records_height() {
        let mut list = list();
        assert!(list.measure_with(4, &Fixed(60.0), &()));
        assert_eq!(list.item(4).unwrap().size(), 60.0);
        assert!(list.measured().get(&PageId::new("p4")).is_some());
    }

    #[test]
    fn test_container_width_change_keeps_relative_position() {
        let mut list = list();
        list.set_scroll_top(1575.0); // halfway through item 10
        list.set_container_width(200.0);
        assert_eq!(list.item(10).unwrap().start, 3000.0);
        assert!((list.scroll_top() - 3150.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_sequence_resets_state() {
        let mut list = list();
        list.record_dimensions(&PageId::new("p1"), 10.0, 10.0);
        list.scroll_to_index(20);
        list.set_sequence(pages(4));
        assert_eq!(list.scroll_top(), 0.0);
        assert!(list.measured().is_empty());
        assert_eq!(list.len(), 4);
        let events = list.recompute();
        assert!(events.contains(&ListEvent::PageChanged(0)));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn visible_range_contains_midpoint_item(
                count in 1..300usize,
                width in 1.0..2000.0f64,
                viewport in 1.0..3000.0f64,
                scroll in 0.0..1.0f64,
            ) {
                let mut list = VirtualList::new(pages(count), width, viewport);
                list.set_scroll_top(scroll * list.max_scroll());
                list.recompute();

                let current = list.current_index().unwrap();
                prop_assert!(list.visible_range().contains(&current));
            }

            #[test]
            fn virtual_items_are_contiguous(
                count in 1..300usize,
                heights in proptest::collection::vec(1.0..5000.0f64, 300),
                scroll in 0.0..1.0f64,
            ) {
                let mut list = VirtualList::new(pages(count), 500.0, 900.0);
                for (i, height) in heights.iter().take(count).enumerate() {
                    list.apply_rendered_height(i, *height);
                }
                list.set_scroll_top(scroll * list.max_scroll());
                list.recompute();

                let items = list.virtual_items();
                prop_assert!(!items.is_empty());
                for pair in items.windows(2) {
                    prop_assert_eq!(pair[0].end, pair[1].start);
                    prop_assert_eq!(pair[0].index + 1, pair[1].index);
                }
            }

            #[test]
            fn mounted_count_is_bounded(
                count in 1..1000usize,
                scroll in 0.0..1.0f64,
            ) {
                // Items are 150 tall; a 900 viewport touches at most 7.
                let mut list = VirtualList::new(pages(count), 100.0, 900.0);
                list.set_scroll_top(scroll * list.max_scroll());
                list.recompute();
                prop_assert!(list.visible_range().len() <= 7 + 2 * DEFAULT_OVERSCAN);
            }

            #[test]
            fn progress_is_percentage(
                count in 0..200usize,
                scroll in 0.0..100_000.0f64,
            ) {
                let mut list = VirtualList::new(pages(count), 100.0, 600.0);
                list.set_scroll_top(scroll);
                let progress = list.progress();
                prop_assert!((0.0..=100.0).contains(&progress));
            }
        }
    }
}
