use thiserror::Error;

use crate::types::Coordinate;

/// A run was refused before any action was taken.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no slots configured")]
    NoSlots,
    #[error("no drop zone configured")]
    MissingDropZone,
    #[error("no confirm button configured")]
    MissingConfirm,
    #[error("delay `{name}` must be a non-negative number of seconds, got {value}")]
    InvalidDelay { name: &'static str, value: f64 },
    #[error("jitter must be within 0.0..=0.9, got {0}")]
    InvalidJitter(f64),
    #[error("engine is already running")]
    AlreadyRunning,
}

/// The screen could not be captured at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    #[error("screen capture unavailable: {0}")]
    Unavailable(String),
    #[error("no display contains {0}")]
    NoDisplay(Coordinate),
    #[error("capture backend failed: {0}")]
    Backend(String),
}

/// One coordinate's color could not be read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error("{0} is outside the captured area")]
    OutOfBounds(Coordinate),
}

/// The synthetic-input backend rejected an event.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("{op} failed: {reason}")]
    Rejected { op: &'static str, reason: String },
    #[error("input backend unavailable: {0}")]
    Unavailable(String),
}

impl InputError {
    pub fn rejected(op: &'static str, reason: impl ToString) -> Self {
        InputError::Rejected { op, reason: reason.to_string() }
    }
}
