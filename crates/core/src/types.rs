use std::fmt;

use serde::{Deserialize, Serialize};

/// Absolute screen position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// RGB pixel color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Per-channel absolute difference, in r/g/b order.
    pub fn channel_diff(&self, other: Color) -> [u8; 3] {
        [
            self.r.abs_diff(other.r),
            self.g.abs_diff(other.g),
            self.b.abs_diff(other.b),
        ]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

/// A watched slot: when `coord` shows `color`, the item there gets dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredSlot {
    pub coord: Coordinate,
    pub color: Color,
}

/// The button clicked after a drag, once it shows `color`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmTarget {
    pub coord: Coordinate,
    pub color: Color,
}

/// Where every drag ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropZone(pub Coordinate);

/// Pauses between engine steps, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Delays {
    pub before_check: f64,
    pub after_press: f64,
    pub drag_duration: f64,
    pub after_drag: f64,
    pub after_click: f64,
    /// Random +/- fraction applied to every pause. 0.0 keeps pauses exact.
    pub jitter: f64,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            before_check: 0.02,
            after_press: 0.02,
            drag_duration: 0.02,
            after_drag: 0.11,
            after_click: 0.01,
            jitter: 0.0,
        }
    }
}

impl Delays {
    /// All pauses zero. Mostly useful for tests and dry runs.
    pub fn none() -> Self {
        Self {
            before_check: 0.0,
            after_press: 0.0,
            drag_duration: 0.0,
            after_drag: 0.0,
            after_click: 0.0,
            jitter: 0.0,
        }
    }

    pub(crate) fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("before_check", self.before_check),
            ("after_press", self.after_press),
            ("drag_duration", self.drag_duration),
            ("after_drag", self.after_drag),
            ("after_click", self.after_click),
        ]
    }
}

/// Sub-region for partial capture, in absolute screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRect {
    pub l: i32,
    pub t: i32,
    pub w: u32,
    pub h: u32,
}

impl CaptureRect {
    /// Smallest rect covering every coordinate, grown by `padding` on each side.
    /// Returns `None` for an empty slice, or when the padded rect does not fit
    /// in screen coordinates.
    pub fn bounding(coords: &[Coordinate], padding: i32) -> Option<Self> {
        let first = coords.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for c in &coords[1..] {
            min_x = min_x.min(c.x);
            min_y = min_y.min(c.y);
            max_x = max_x.max(c.x);
            max_y = max_y.max(c.y);
        }
        let pad = i64::from(padding);
        let (l, r) = (i64::from(min_x) - pad, i64::from(max_x) + pad);
        let (t, b) = (i64::from(min_y) - pad, i64::from(max_y) + pad);
        // Every edge pixel must stay addressable.
        i32::try_from(r).ok()?;
        i32::try_from(b).ok()?;
        Some(Self {
            l: i32::try_from(l).ok()?,
            t: i32::try_from(t).ok()?,
            w: u32::try_from(r - l + 1).ok()?,
            h: u32::try_from(b - t + 1).ok()?,
        })
    }

    /// Right and bottom edges, exclusive.
    pub fn right(&self) -> i64 {
        i64::from(self.l) + i64::from(self.w)
    }

    pub fn bottom(&self) -> i64 {
        i64::from(self.t) + i64::from(self.h)
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.x >= self.l && c.y >= self.t && i64::from(c.x) < self.right() && i64::from(c.y) < self.bottom()
    }
}

/// Raw screenshot pixel data (RGBA). `left`/`top` is the absolute screen
/// position of the first pixel; a backend may return less than it was asked
/// for when the request runs off the edge of a display.
#[derive(Debug, Clone)]
pub struct Capture {
    pub data: Vec<u8>,
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

impl Capture {
    /// Color at an absolute screen coordinate, if it lies inside this capture.
    pub fn pixel_at(&self, c: Coordinate) -> Option<Color> {
        let dx = i64::from(c.x) - i64::from(self.left);
        let dy = i64::from(c.y) - i64::from(self.top);
        if dx < 0 || dy < 0 || dx >= i64::from(self.width) || dy >= i64::from(self.height) {
            return None;
        }
        let offset = dy as usize * self.bytes_per_row as usize + dx as usize * 4;
        let px = self.data.get(offset..offset + 3)?;
        Some(Color::new(px[0], px[1], px[2]))
    }
}
