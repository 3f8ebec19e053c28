use crate::error::{CaptureError, InputError};
use crate::logger;
use crate::types::*;
use super::{Platform, Pointer, ScreenCapture};

/// Logs every call. Has no screen, so captures always fail and the engine
/// never finds a match.
pub struct StubPlatform;

impl ScreenCapture for StubPlatform {
    fn capture(&mut self, rect: CaptureRect) -> Result<Capture, CaptureError> {
        logger::debug_p("stub", &format!("capture({:?})", rect));
        Err(CaptureError::Unavailable("stub platform has no screen".into()))
    }
}

impl Pointer for StubPlatform {
    fn move_to(&mut self, at: Coordinate) -> Result<(), InputError> {
        logger::info_p("stub", &format!("move_to{}", at));
        Ok(())
    }

    fn press(&mut self) -> Result<(), InputError> {
        logger::info_p("stub", "press()");
        Ok(())
    }

    fn release(&mut self) -> Result<(), InputError> {
        logger::info_p("stub", "release()");
        Ok(())
    }

    fn click(&mut self) -> Result<(), InputError> {
        logger::info_p("stub", "click()");
        Ok(())
    }
}

impl Platform for StubPlatform {
    fn name(&self) -> &'static str {
        "stub"
    }
}
