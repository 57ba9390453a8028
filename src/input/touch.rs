//! Touch gesture recognition.
//!
//! Transitions:
//!
//! | Phase      | Event                    | Next       | Emits                          |
//! |------------|--------------------------|------------|--------------------------------|
//! | any        | start, 2+ fingers        | `Pinching` | nothing                        |
//! | any        | start, 1 finger          | `Pressed`  | nothing                        |
//! | `Pinching` | move, 2+ fingers         | `Pinching` | `SetZoom` when the zoom moves  |
//! | `Pinching` | end                      | `Idle`     | nothing                        |
//! | `Pressed`  | end, swipe               | `Idle`     | nothing                        |
//! | `Pressed`  | end, tap within window   | `Idle`     | `SetZoom` 100 <-> 150          |
//! | `Pressed`  | end, tap                 | `Idle`     | edge page turn or controls     |
//! | `Idle`     | move / end               | `Idle`     | nothing                        |
//!
//! A press is a tap when it lasts less than [`TAP_MAX_DURATION_MS`] and
//! moves less than [`TAP_MAX_MOVEMENT_PX`] on both axes. A double tap
//! clears the tap timer, so a third tap always starts a new sequence.

use super::Intent;
use crate::viewer::{ZOOM_DEFAULT, ZOOM_DOUBLE_TAP, clamp_zoom};

pub const TAP_MAX_DURATION_MS: u64 = 300;
pub const TAP_MAX_MOVEMENT_PX: f64 = 30.0;
pub const DOUBLE_TAP_WINDOW_MS: u64 = 300;
/// Share of the width on each side that turns pages.
pub const EDGE_ZONE_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TouchEvent {
    Start { touches: Vec<Point>, at_ms: u64 },
    Move { touches: Vec<Point> },
    End { point: Point, at_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TouchPhase {
    #[default]
    Idle,
    Pressed {
        start: Point,
        at_ms: u64,
    },
    Pinching {
        start_distance: f64,
        start_zoom: u16,
    },
}

#[derive(Debug, Clone, Default)]
pub struct TouchMachine {
    phase: TouchPhase,
    last_tap_ms: Option<u64>,
}

impl TouchMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn phase(&self) -> TouchPhase {
        self.phase
    }

    /// Feed one event. `zoom` is the current zoom and `viewport_width`
    /// the width the tap zones are measured against.
    pub fn handle(&mut self, event: &TouchEvent, zoom: u16, viewport_width: f64) -> Option<Intent> {
        match event {
            TouchEvent::Start { touches, at_ms } => {
                self.start(touches, *at_ms, zoom);
                None
            }
            TouchEvent::Move { touches } => self.pinch_to(touches, zoom),
            TouchEvent::End { point, at_ms } => self.end(*point, *at_ms, zoom, viewport_width),
        }
    }

    fn start(&mut self, touches: &[Point], at_ms: u64, zoom: u16) {
        self.phase = match touches {
            [a, b, ..] => TouchPhase::Pinching {
                start_distance: a.distance(*b),
                start_zoom: zoom,
            },
            [start] => TouchPhase::Pressed {
                start: *start,
                at_ms,
            },
            [] => TouchPhase::Idle,
        };
    }

    fn pinch_to(&self, touches: &[Point], zoom: u16) -> Option<Intent> {
        let TouchPhase::Pinching {
            start_distance,
            start_zoom,
        } = self.phase
        else {
            return None;
        };
        let [a, b, ..] = touches else {
            return None;
        };
        if start_distance <= 0.0 || !start_distance.is_finite() {
            return None;
        }
        let scaled = f64::from(start_zoom) * (a.distance(*b) / start_distance);
        #[allow(clippy::cast_possible_truncation)]
        let next = clamp_zoom(scaled.round() as i64);
        (next != zoom).then_some(Intent::SetZoom(next))
    }

    fn end(&mut self, point: Point, at_ms: u64, zoom: u16, viewport_width: f64) -> Option<Intent> {
        let phase = std::mem::take(&mut self.phase);
        let TouchPhase::Pressed { start, at_ms: began } = phase else {
            return None;
        };

        let elapsed = at_ms.saturating_sub(began);
        let moved_x = (point.x - start.x).abs();
        let moved_y = (point.y - start.y).abs();
        if elapsed >= TAP_MAX_DURATION_MS
            || moved_x >= TAP_MAX_MOVEMENT_PX
            || moved_y >= TAP_MAX_MOVEMENT_PX
        {
            return None;
        }

        if let Some(last) = self.last_tap_ms
            && at_ms.saturating_sub(last) < DOUBLE_TAP_WINDOW_MS
        {
            self.last_tap_ms = None;
            let target = if zoom == ZOOM_DEFAULT {
                ZOOM_DOUBLE_TAP
            } else {
                ZOOM_DEFAULT
            };
            return Some(Intent::SetZoom(target));
        }
        self.last_tap_ms = Some(at_ms);
        Some(Self::zone_intent(point.x, viewport_width))
    }

    fn zone_intent(x: f64, width: f64) -> Intent {
        if width <= 0.0 {
            return Intent::ToggleControls;
        }
        let fraction = x / width;
        if fraction < EDGE_ZONE_FRACTION {
            Intent::PrevPage
        } else if fraction > 1.0 - EDGE_ZONE_FRACTION {
            Intent::NextPage
        } else {
            Intent::ToggleControls
        }
    }
}
