//! Pixel sampling. Capture cost grows with the number of screenshots far
//! faster than with their size, so a batch always takes a single capture of
//! the region spanning every requested coordinate.

use crate::error::SampleError;
use crate::platform::ScreenCapture;
use crate::types::{CaptureRect, Color, Coordinate};

/// Extra pixels captured around the bounding box of a batch.
pub const PADDING: i32 = 5;

pub type Sample = Result<Color, SampleError>;

/// Read the color at a single coordinate.
pub fn sample_one<C: ScreenCapture + ?Sized>(screen: &mut C, at: Coordinate) -> Sample {
    let mut batch = sample_batch(screen, &[at]);
    batch.pop().unwrap_or(Err(SampleError::OutOfBounds(at)))
}

/// Read the colors at every coordinate with at most one capture.
/// The result has the same length and order as `coords`; entries fail
/// independently when the capture does not cover them. Coordinates too close
/// to the limits of screen space to be padded are left out of the capture
/// and fail on their own.
pub fn sample_batch<C: ScreenCapture + ?Sized>(screen: &mut C, coords: &[Coordinate]) -> Vec<Sample> {
    if coords.is_empty() {
        return Vec::new();
    }
    let addressable: Vec<Coordinate> = coords
        .iter()
        .copied()
        .filter(|c| CaptureRect::bounding(&[*c], PADDING).is_some())
        .collect();
    let Some(rect) = CaptureRect::bounding(&addressable, PADDING) else {
        return coords.iter().map(|c| Err(SampleError::OutOfBounds(*c))).collect();
    };
    match screen.capture(rect) {
        Ok(capture) => coords
            .iter()
            .map(|c| capture.pixel_at(*c).ok_or(SampleError::OutOfBounds(*c)))
            .collect(),
        Err(e) => coords.iter().map(|_| Err(SampleError::Capture(e.clone()))).collect(),
    }
}
