//! The decide-act loop: sample every slot plus the confirm button, drag the
//! first matching slot to the drop zone, then click confirm if it lit up.
//!
//! Cancellation is cooperative and checked once per cycle, before the
//! `before_check` pause. A drag/confirm/click sequence that has started always
//! runs to completion, so `stop()` takes effect within one cycle, not
//! instantly.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::color;
use crate::error::{ConfigError, InputError};
use crate::logger::Level;
use crate::platform::{Pointer, ScreenCapture};
use crate::report::{LogReporter, Reporter};
use crate::sampler;
use crate::sleep;
use crate::types::*;

/// Log a progress line every this many confirmed actions.
pub const PROGRESS_EVERY: u64 = 50;

/// Warn once a coordinate has failed to sample this many cycles in a row.
pub const FAILURE_STREAK_WARN: u32 = 20;

// Run state bits. Kept in one atomic so a run releases both at once.
const RUNNING: u8 = 0b01;
const STOP_REQUESTED: u8 = 0b10;

/// Everything one run needs. The engine only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub slots: Vec<MonitoredSlot>,
    pub drop_zone: DropZone,
    pub confirm: ConfirmTarget,
    pub tolerance: u8,
    pub delays: Delays,
    /// Report per-slot color differences every cycle (debug level).
    pub debug_color_matching: bool,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::NoSlots);
        }
        for (name, value) in self.delays.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDelay { name, value });
            }
        }
        if !(0.0..=0.9).contains(&self.delays.jitter) {
            return Err(ConfigError::InvalidJitter(self.delays.jitter));
        }
        Ok(())
    }
}

/// Thread-safe stop flag. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// `stop()` or the stop predicate ended the run.
    Stopped,
    /// The configuration was refused; nothing was done.
    Rejected(ConfigError),
    /// An input event failed mid-sequence; the screen state is unknown.
    ActionFailed(InputError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub success_count: u64,
    pub elapsed: Duration,
    pub rate_per_min: f64,
}

impl RunSummary {
    fn rejected(e: ConfigError) -> Self {
        Self {
            outcome: RunOutcome::Rejected(e),
            success_count: 0,
            elapsed: Duration::ZERO,
            rate_per_min: 0.0,
        }
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self.outcome, RunOutcome::Stopped)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} confirmed in {:.2}s ({:.1}/min)",
            self.success_count,
            self.elapsed.as_secs_f64(),
            self.rate_per_min
        )?;
        match &self.outcome {
            RunOutcome::Stopped => Ok(()),
            RunOutcome::Rejected(e) => write!(f, ", rejected: {}", e),
            RunOutcome::ActionFailed(e) => write!(f, ", failed: {}", e),
        }
    }
}

/// Live view of the engine for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub running: bool,
    pub success_count: u64,
    pub elapsed: Duration,
    pub rate_per_min: f64,
}

pub fn rate_per_min(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if count == 0 || secs <= 0.0 {
        0.0
    } else {
        count as f64 * 60.0 / secs
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RunClock {
    started: Option<Instant>,
    ended: Option<Instant>,
}

pub struct Engine {
    state: AtomicU8,
    success_count: AtomicU64,
    clock: Mutex<RunClock>,
    reporter: Box<dyn Reporter>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Box::new(LogReporter::new("engine")))
    }
}

impl Engine {
    pub fn new(reporter: Box<dyn Reporter>) -> Self {
        Self {
            state: AtomicU8::new(0),
            success_count: AtomicU64::new(0),
            clock: Mutex::new(RunClock::default()),
            reporter,
        }
    }

    /// Ask the loop to exit after its current cycle. Safe to call from any
    /// thread, any number of times.
    ///
    /// A stop is consumed by the next run that takes the engine, whatever
    /// that run's outcome: a stop issued while idle makes the next run
    /// return without a single cycle (or be rejected, if its config is
    /// invalid), and a run clears the request in the same step that marks
    /// the engine idle. A run refused with `AlreadyRunning` leaves the
    /// request for the active run.
    pub fn stop(&self) {
        self.state.fetch_or(STOP_REQUESTED, Ordering::AcqRel);
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) & RUNNING != 0
    }

    fn stop_requested(&self) -> bool {
        self.state.load(Ordering::Acquire) & STOP_REQUESTED != 0
    }

    /// Mark the engine idle and drop any pending stop request.
    fn release(&self) {
        self.state.store(0, Ordering::Release);
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Acquire)
    }

    pub fn status(&self) -> EngineStatus {
        let clock = self.read_clock();
        let elapsed = match clock.started {
            Some(start) => clock.ended.unwrap_or_else(Instant::now).duration_since(start),
            None => Duration::ZERO,
        };
        let success_count = self.success_count();
        EngineStatus {
            running: self.is_running(),
            success_count,
            elapsed,
            rate_per_min: rate_per_min(success_count, elapsed),
        }
    }

    fn read_clock(&self) -> RunClock {
        *self.clock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_clock(&self, clock: RunClock) {
        *self.clock.lock().unwrap_or_else(|e| e.into_inner()) = clock;
    }

    /// Run the loop on the calling thread until `stop()` is called or
    /// `should_stop` returns true.
    pub fn run<P>(&self, platform: &mut P, config: &RunConfig, mut should_stop: impl FnMut() -> bool) -> RunSummary
    where
        P: ScreenCapture + Pointer + ?Sized,
    {
        if self.state.fetch_or(RUNNING, Ordering::AcqRel) & RUNNING != 0 {
            let e = ConfigError::AlreadyRunning;
            self.reporter.report(Level::Warn, &format!("cannot start: {}", e));
            return RunSummary::rejected(e);
        }
        if let Err(e) = config.validate() {
            self.release();
            self.reporter.report(Level::Warn, &format!("cannot start: {}", e));
            return RunSummary::rejected(e);
        }

        self.success_count.store(0, Ordering::Release);
        let started = Instant::now();
        self.set_clock(RunClock { started: Some(started), ended: None });
        self.reporter.report(
            Level::Info,
            &format!(
                "started with {} slot(s), tolerance {}",
                config.slots.len(),
                config.tolerance
            ),
        );

        let mut coords: Vec<Coordinate> = config.slots.iter().map(|s| s.coord).collect();
        coords.push(config.confirm.coord);
        let mut streaks = vec![0u32; coords.len()];

        let outcome = loop {
            if self.stop_requested() || should_stop() {
                break RunOutcome::Stopped;
            }
            sleep::pause(config.delays.before_check, config.delays.jitter);
            if let Err(e) = self.cycle(platform, config, &coords, &mut streaks) {
                self.reporter.report(Level::Error, &format!("input failed, stopping: {}", e));
                break RunOutcome::ActionFailed(e);
            }
        };

        let ended = Instant::now();
        self.set_clock(RunClock { started: Some(started), ended: Some(ended) });
        let success_count = self.success_count();
        let elapsed = ended.duration_since(started);
        self.release();

        let summary = RunSummary {
            outcome,
            success_count,
            elapsed,
            rate_per_min: rate_per_min(success_count, elapsed),
        };
        let level = if summary.is_failure() { Level::Error } else { Level::Info };
        self.reporter.report(level, &format!("finished: {}", summary));
        summary
    }

    /// One sample-evaluate-act pass. Only input failures escape.
    /// `streaks` counts consecutive failed samples per coordinate.
    fn cycle<P>(
        &self,
        platform: &mut P,
        config: &RunConfig,
        coords: &[Coordinate],
        streaks: &mut [u32],
    ) -> Result<(), InputError>
    where
        P: ScreenCapture + Pointer + ?Sized,
    {
        let samples = sampler::sample_batch(platform, coords);
        let mut colors = Vec::with_capacity(coords.len());
        let mut failed = false;
        for ((at, sample), streak) in coords.iter().zip(samples).zip(streaks.iter_mut()) {
            match sample {
                Ok(c) => {
                    *streak = 0;
                    colors.push(c);
                }
                Err(e) => {
                    *streak = streak.saturating_add(1);
                    if *streak == FAILURE_STREAK_WARN {
                        self.reporter.report(
                            Level::Warn,
                            &format!("sample at {} failed {} cycles in a row: {}", at, streak, e),
                        );
                    } else if !failed {
                        self.reporter.report(Level::Debug, &format!("sample at {} failed: {}", at, e));
                    }
                    failed = true;
                }
            }
        }
        if failed {
            return Ok(());
        }
        let slot_colors = &colors[..config.slots.len()];

        if config.debug_color_matching && self.reporter.enabled(Level::Debug) {
            self.report_colors(config, slot_colors);
        }

        let mut matched = false;
        for (index, (slot, current)) in config.slots.iter().zip(slot_colors).enumerate() {
            if !color::matches(Some(*current), slot.color, config.tolerance) {
                continue;
            }
            matched = true;
            if self.act_on_slot(platform, config, index, slot)? {
                return Ok(());
            }
        }

        let msg = if matched {
            "dragged but nothing confirmed, waiting"
        } else {
            "no slot matches, waiting"
        };
        self.reporter.report(Level::Debug, msg);
        Ok(())
    }

    /// Drag `slot` to the drop zone and click confirm if it shows its color.
    /// Returns whether the click happened.
    fn act_on_slot<P>(
        &self,
        platform: &mut P,
        config: &RunConfig,
        index: usize,
        slot: &MonitoredSlot,
    ) -> Result<bool, InputError>
    where
        P: ScreenCapture + Pointer + ?Sized,
    {
        let d = &config.delays;
        self.reporter.report(Level::Debug, &format!("slot {} matched, dragging", index + 1));
        drag(platform, slot.coord, config.drop_zone.0, d)?;
        sleep::pause(d.after_drag, d.jitter);

        // The drag itself changes the button, so the batch value is stale.
        let fresh = sampler::sample_one(platform, config.confirm.coord);
        if !color::matches(fresh.as_ref().ok().copied(), config.confirm.color, config.tolerance) {
            let seen = match &fresh {
                Ok(c) => c.to_string(),
                Err(e) => e.to_string(),
            };
            self.reporter.report(
                Level::Debug,
                &format!(
                    "confirm at {} shows {}, want {}; checking remaining slots",
                    config.confirm.coord, seen, config.confirm.color
                ),
            );
            return Ok(false);
        }

        platform.move_to(config.confirm.coord)?;
        platform.click()?;
        sleep::pause(d.after_click, d.jitter);

        let total = self.success_count.fetch_add(1, Ordering::AcqRel) + 1;
        self.reporter.report(Level::Info, &format!("slot {} confirmed, total {}", index + 1, total));
        if total % PROGRESS_EVERY == 0 {
            let status = self.status();
            self.reporter.report(
                Level::Info,
                &format!(
                    "progress: {} at {:.1}/min over {:.1}s",
                    total,
                    status.rate_per_min,
                    status.elapsed.as_secs_f64()
                ),
            );
        }
        Ok(true)
    }

    fn report_colors(&self, config: &RunConfig, current: &[Color]) {
        for (index, (slot, c)) in config.slots.iter().zip(current).enumerate() {
            let diff = c.channel_diff(slot.color);
            self.reporter.report(
                Level::Debug,
                &format!(
                    "slot {}: current={} target={} diff={:?} max={} tolerance={} match={}",
                    index + 1,
                    c,
                    slot.color,
                    diff,
                    color::max_diff(*c, slot.color),
                    config.tolerance,
                    color::matches(Some(*c), slot.color, config.tolerance)
                ),
            );
        }
    }
}

/// Press at `from`, carry to `to`, release. Steps run strictly in order.
fn drag<P: Pointer + ?Sized>(p: &mut P, from: Coordinate, to: Coordinate, d: &Delays) -> Result<(), InputError> {
    p.move_to(from)?;
    p.press()?;
    sleep::pause(d.after_press, d.jitter);
    p.move_to(to)?;
    sleep::pause(d.drag_duration, d.jitter);
    p.release()
}
