use enigo::{Button, Direction, Enigo, Mouse, Settings};
use xcap::Monitor;

use crate::error::{CaptureError, InputError};
use crate::logger;
use crate::types::*;
use super::{Platform, Pointer, ScreenCapture};

/// Real screen and mouse: `xcap` for region captures, `enigo` for input.
pub struct DesktopPlatform {
    enigo: Enigo,
}

impl DesktopPlatform {
    pub fn new() -> anyhow::Result<Self> {
        let enigo = Enigo::new(&Settings::default())?;
        logger::info_p("desktop", "input backend ready");
        Ok(Self { enigo })
    }
}

/// Absolute bounds of a monitor as (l, t, r, b), right/bottom exclusive.
fn monitor_bounds(m: &Monitor) -> Result<(i64, i64, i64, i64), CaptureError> {
    let backend = |e: xcap::XCapError| CaptureError::Backend(e.to_string());
    let l = i64::from(m.x().map_err(backend)?);
    let t = i64::from(m.y().map_err(backend)?);
    let w = i64::from(m.width().map_err(backend)?);
    let h = i64::from(m.height().map_err(backend)?);
    Ok((l, t, l + w, t + h))
}

impl ScreenCapture for DesktopPlatform {
    fn capture(&mut self, rect: CaptureRect) -> Result<Capture, CaptureError> {
        let mid = |start: i32, len: u32| {
            (i64::from(start) + i64::from(len) / 2).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        };
        let center = Coordinate::new(mid(rect.l, rect.w), mid(rect.t, rect.h));
        let monitor = Monitor::from_point(center.x, center.y)
            .map_err(|_| CaptureError::NoDisplay(center))?;
        let (ml, mt, mr, mb) = monitor_bounds(&monitor)?;

        // Padding may run past the display edge; capture only the overlap.
        let l = i64::from(rect.l).max(ml);
        let t = i64::from(rect.t).max(mt);
        let r = rect.right().min(mr);
        let b = rect.bottom().min(mb);
        if r <= l || b <= t {
            return Err(CaptureError::NoDisplay(center));
        }

        let image = monitor
            .capture_region((l - ml) as u32, (t - mt) as u32, (r - l) as u32, (b - t) as u32)
            .map_err(|e| CaptureError::Backend(e.to_string()))?;
        let (width, height) = (image.width(), image.height());
        Ok(Capture {
            data: image.into_raw(),
            // both are the larger of two i32 values
            left: l as i32,
            top: t as i32,
            width,
            height,
            bytes_per_row: width * 4,
        })
    }
}

impl Pointer for DesktopPlatform {
    fn move_to(&mut self, at: Coordinate) -> Result<(), InputError> {
        self.enigo
            .move_mouse(at.x, at.y, enigo::Coordinate::Abs)
            .map_err(|e| InputError::rejected("move_to", e))
    }

    fn press(&mut self) -> Result<(), InputError> {
        self.enigo
            .button(Button::Left, Direction::Press)
            .map_err(|e| InputError::rejected("press", e))
    }

    fn release(&mut self) -> Result<(), InputError> {
        self.enigo
            .button(Button::Left, Direction::Release)
            .map_err(|e| InputError::rejected("release", e))
    }

    fn click(&mut self) -> Result<(), InputError> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| InputError::rejected("click", e))
    }
}

impl Platform for DesktopPlatform {
    fn name(&self) -> &'static str {
        "desktop"
    }
}
