use rand::Rng;
use std::thread;
use std::time::Duration;

/// Sleep for `secs` seconds with a random +/-`jitter` fraction applied.
/// Zero, negative or non-finite durations return immediately.
pub fn pause(secs: f64, jitter: f64) {
    let actual = jittered(secs, jitter, &mut rand::thread_rng());
    if actual > 0.0 {
        thread::sleep(Duration::from_secs_f64(actual));
    }
}

fn jittered(secs: f64, jitter: f64, rng: &mut impl Rng) -> f64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0.0;
    }
    if jitter <= 0.0 {
        return secs;
    }
    let spread = secs * jitter;
    (secs + rng.gen_range(-spread..=spread)).max(0.0)
}
