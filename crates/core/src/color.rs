use crate::types::Color;

/// True when `sampled` is present and every channel is within `tolerance`
/// of `target`. A missing sample never matches.
pub fn matches(sampled: Option<Color>, target: Color, tolerance: u8) -> bool {
    match sampled {
        Some(c) => c.channel_diff(target).iter().all(|d| *d <= tolerance),
        None => false,
    }
}

/// Largest single-channel difference between two colors.
pub fn max_diff(a: Color, b: Color) -> u8 {
    a.channel_diff(b).into_iter().max().unwrap_or(0)
}
