pub mod stub;
pub mod hotkey;

#[cfg(feature = "desktop")]
pub mod desktop;

use crate::error::{CaptureError, InputError};
use crate::logger;
use crate::types::*;

/// Reads pixels off the screen.
pub trait ScreenCapture {
    /// Capture `rect` (absolute screen pixels). One call is one screenshot.
    fn capture(&mut self, rect: CaptureRect) -> Result<Capture, CaptureError>;
}

/// Synthetic mouse input. Every call returns once the OS has accepted the event.
pub trait Pointer {
    fn move_to(&mut self, at: Coordinate) -> Result<(), InputError>;
    fn press(&mut self) -> Result<(), InputError>;
    fn release(&mut self) -> Result<(), InputError>;
    fn click(&mut self) -> Result<(), InputError>;
}

/// Everything the engine drives: a screen to read and a cursor to move.
pub trait Platform: ScreenCapture + Pointer {
    fn name(&self) -> &'static str;
}

/// Create the platform appropriate for this build.
pub fn create_platform(force_stub: bool) -> anyhow::Result<Box<dyn Platform>> {
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Ok(Box::new(stub::StubPlatform));
    }
    #[cfg(feature = "desktop")]
    {
        logger::register_prefix("desktop", logger::COLOR_GRAY);
        return Ok(Box::new(desktop::DesktopPlatform::new()?));
    }
    #[cfg(not(feature = "desktop"))]
    {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        logger::warn("built without the `desktop` feature, using the stub platform");
        Ok(Box::new(stub::StubPlatform))
    }
}
