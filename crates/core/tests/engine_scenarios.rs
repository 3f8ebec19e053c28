//! End-to-end engine behavior against a scripted screen and a recording mouse.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use altar_core::engine::{Engine, RunConfig, RunOutcome, FAILURE_STREAK_WARN};
use altar_core::error::{CaptureError, ConfigError, InputError};
use altar_core::logger::Level;
use altar_core::platform::{Pointer, ScreenCapture};
use altar_core::report::Reporter;
use altar_core::types::*;
use pretty_assertions::assert_eq;

const SLOT: Coordinate = Coordinate::new(10, 10);
const DROP: Coordinate = Coordinate::new(50, 50);
const BUTTON: Coordinate = Coordinate::new(200, 200);
const ITEM: Color = Color::new(100, 100, 100);
const LIT: Color = Color::new(219, 124, 0);
const DARK: Color = Color::new(0, 0, 0);

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Capture,
    MoveTo(Coordinate),
    Press,
    Release,
    Click,
}

type Frame = HashMap<Coordinate, Color>;

fn frame(pixels: &[(Coordinate, Color)]) -> Frame {
    pixels.iter().copied().collect()
}

/// Screen that shows `frames[n]` for the n-th capture (the last frame
/// repeats), plus a mouse that records every event.
struct FakeDesk {
    frames: Vec<Frame>,
    captures: usize,
    failing_captures: usize,
    calls: Vec<Call>,
    fail_op: Option<&'static str>,
    stop_on_press: Option<Arc<Engine>>,
    /// Captures are cut to this width, like a display edge.
    max_width: Option<u32>,
}

impl FakeDesk {
    fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            captures: 0,
            failing_captures: 0,
            calls: Vec::new(),
            fail_op: None,
            stop_on_press: None,
            max_width: None,
        }
    }

    fn input(&mut self, op: &'static str, call: Call) -> Result<(), InputError> {
        self.calls.push(call);
        if self.fail_op == Some(op) {
            return Err(InputError::rejected(op, "device unplugged"));
        }
        Ok(())
    }

    fn clicks(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Click).count()
    }
}

impl ScreenCapture for FakeDesk {
    fn capture(&mut self, rect: CaptureRect) -> Result<Capture, CaptureError> {
        self.calls.push(Call::Capture);
        let n = self.captures;
        self.captures += 1;
        if n < self.failing_captures {
            return Err(CaptureError::Backend("display asleep".into()));
        }

        let shown = &self.frames[n.min(self.frames.len() - 1)];
        let rect = CaptureRect { w: rect.w.min(self.max_width.unwrap_or(u32::MAX)), ..rect };
        let bytes_per_row = rect.w * 4;
        let mut data: Vec<u8> = (0..rect.w * rect.h).flat_map(|_| [0, 0, 0, 255]).collect();
        for (at, c) in shown {
            if rect.contains(*at) {
                let offset = ((at.y - rect.t) as u32 * bytes_per_row + (at.x - rect.l) as u32 * 4) as usize;
                data[offset..offset + 3].copy_from_slice(&[c.r, c.g, c.b]);
            }
        }
        Ok(Capture { data, left: rect.l, top: rect.t, width: rect.w, height: rect.h, bytes_per_row })
    }
}

impl Pointer for FakeDesk {
    fn move_to(&mut self, at: Coordinate) -> Result<(), InputError> {
        self.input("move_to", Call::MoveTo(at))
    }

    fn press(&mut self) -> Result<(), InputError> {
        if let Some(engine) = &self.stop_on_press {
            engine.stop();
        }
        self.input("press", Call::Press)
    }

    fn release(&mut self) -> Result<(), InputError> {
        self.input("release", Call::Release)
    }

    fn click(&mut self) -> Result<(), InputError> {
        self.input("click", Call::Click)
    }
}

#[derive(Clone, Default)]
struct RecordingReporter(Arc<Mutex<Vec<(Level, String)>>>);

impl RecordingReporter {
    fn has(&self, level: Level, needle: &str) -> bool {
        self.count(level, needle) > 0
    }

    fn count(&self, level: Level, needle: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|(l, m)| *l == level && m.contains(needle)).count()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, level: Level, msg: &str) {
        self.0.lock().unwrap().push((level, msg.to_string()));
    }
}

fn slot(coord: Coordinate, color: Color) -> MonitoredSlot {
    MonitoredSlot { coord, color }
}

fn config(slots: Vec<MonitoredSlot>) -> RunConfig {
    RunConfig {
        slots,
        drop_zone: DropZone(DROP),
        confirm: ConfirmTarget { coord: BUTTON, color: LIT },
        tolerance: 5,
        delays: Delays::none(),
        debug_color_matching: false,
    }
}

/// Predicate that lets exactly `n` cycles start.
fn cycles(n: usize) -> impl FnMut() -> bool {
    let mut checks = 0;
    move || {
        checks += 1;
        checks > n
    }
}

fn drag_calls(from: Coordinate) -> Vec<Call> {
    vec![Call::MoveTo(from), Call::Press, Call::MoveTo(DROP), Call::Release]
}

fn engine() -> (Engine, RecordingReporter) {
    let reporter = RecordingReporter::default();
    (Engine::new(Box::new(reporter.clone())), reporter)
}

#[test]
fn test_match_drags_confirms_and_clicks() {
    let (engine, reporter) = engine();
    let mut desk = FakeDesk::new(vec![
        frame(&[(SLOT, ITEM), (BUTTON, DARK)]),
        frame(&[(BUTTON, LIT)]),
    ]);

    let summary = engine.run(&mut desk, &config(vec![slot(SLOT, ITEM)]), cycles(2));

    let mut expected = vec![Call::Capture];
    expected.extend(drag_calls(SLOT));
    expected.extend([Call::Capture, Call::MoveTo(BUTTON), Call::Click, Call::Capture]);
    assert_eq!(desk.calls, expected);
    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert_eq!(summary.success_count, 1);
    assert_eq!(engine.success_count(), 1);
    assert!(!engine.is_running());
    assert!(reporter.has(Level::Info, "slot 1 confirmed, total 1"));
    assert!(reporter.has(Level::Debug, "no slot matches"));
}

#[test]
fn test_unconfirmed_drag_does_not_click() {
    let (engine, _) = engine();
    let mut desk = FakeDesk::new(vec![
        frame(&[(SLOT, ITEM), (BUTTON, LIT)]),
        frame(&[(BUTTON, DARK)]),
    ]);

    let summary = engine.run(&mut desk, &config(vec![slot(SLOT, ITEM)]), cycles(1));

    let mut expected = vec![Call::Capture];
    expected.extend(drag_calls(SLOT));
    expected.push(Call::Capture);
    assert_eq!(desk.calls, expected);
    assert_eq!(summary.success_count, 0);
}

#[test]
fn test_zero_slots_is_rejected_without_input() {
    let (engine, reporter) = engine();
    let mut desk = FakeDesk::new(vec![Frame::new()]);

    let summary = engine.run(&mut desk, &config(Vec::new()), || false);

    assert_eq!(summary.outcome, RunOutcome::Rejected(ConfigError::NoSlots));
    assert_eq!(summary.success_count, 0);
    assert!(desk.calls.is_empty());
    assert!(!engine.is_running());
    assert!(reporter.has(Level::Warn, "no slots configured"));
}

#[test]
fn test_stop_lets_in_flight_cycle_finish() {
    let (engine, _) = engine();
    let engine = Arc::new(engine);
    let cfg = config(vec![slot(SLOT, ITEM)]);
    let mut desk = FakeDesk::new(vec![frame(&[(SLOT, ITEM), (BUTTON, LIT)])]);
    desk.stop_on_press = Some(Arc::clone(&engine));

    let summary = engine.run(&mut desk, &cfg, || false);

    // Stop landed mid-drag: the click still happens, and no second cycle starts.
    assert_eq!(desk.calls.last(), Some(&Call::Click));
    assert_eq!(desk.clicks(), 1);
    assert_eq!(desk.captures, 2);
    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert_eq!(summary.success_count, 1);
    assert!(!engine.is_running());

    // The stop was spent on that run; the next one cycles.
    let mut idle = FakeDesk::new(vec![Frame::new()]);
    engine.run(&mut idle, &cfg, cycles(2));
    assert_eq!(idle.captures, 2);
}

#[test]
fn test_stop_from_another_thread() {
    let (engine, _) = engine();
    let engine = Arc::new(engine);
    let mut cfg = config(vec![slot(SLOT, ITEM)]);
    cfg.delays.before_check = 0.005;

    let worker = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let mut desk = FakeDesk::new(vec![frame(&[(SLOT, ITEM), (BUTTON, LIT)])]);
            engine.run(&mut desk, &cfg, || false)
        })
    };

    let deadline = Instant::now() + Duration::from_secs(5);
    while engine.success_count() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    engine.stop();
    let summary = worker.join().unwrap();

    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert!(summary.success_count >= 3);
    assert_eq!(engine.status().success_count, summary.success_count);
    assert!(!engine.status().running);
}

#[test]
fn test_lowest_matching_slot_wins_the_cycle() {
    let (engine, _) = engine();
    let slots = vec![
        slot(Coordinate::new(10, 10), ITEM),
        slot(Coordinate::new(10, 30), ITEM),
        slot(Coordinate::new(10, 50), ITEM),
    ];
    let mut desk = FakeDesk::new(vec![
        frame(&[(slots[0].coord, ITEM), (slots[2].coord, ITEM)]),
        frame(&[(BUTTON, LIT)]),
        frame(&[(slots[2].coord, ITEM)]),
        frame(&[(BUTTON, LIT)]),
    ]);

    let summary = engine.run(&mut desk, &config(slots.clone()), cycles(2));

    let mut expected = vec![Call::Capture];
    expected.extend(drag_calls(slots[0].coord));
    expected.extend([Call::Capture, Call::MoveTo(BUTTON), Call::Click, Call::Capture]);
    expected.extend(drag_calls(slots[2].coord));
    expected.extend([Call::Capture, Call::MoveTo(BUTTON), Call::Click]);
    assert_eq!(desk.calls, expected);
    assert_eq!(summary.success_count, 2);
}

#[test]
fn test_failed_confirm_moves_on_to_next_slot() {
    let (engine, reporter) = engine();
    let slots = vec![slot(Coordinate::new(10, 10), ITEM), slot(Coordinate::new(10, 30), ITEM)];
    let mut desk = FakeDesk::new(vec![
        frame(&[(slots[0].coord, ITEM), (slots[1].coord, ITEM)]),
        frame(&[(BUTTON, DARK)]),
        frame(&[(BUTTON, LIT)]),
    ]);

    let summary = engine.run(&mut desk, &config(slots.clone()), cycles(1));

    let mut expected = vec![Call::Capture];
    expected.extend(drag_calls(slots[0].coord));
    expected.push(Call::Capture);
    expected.extend(drag_calls(slots[1].coord));
    expected.extend([Call::Capture, Call::MoveTo(BUTTON), Call::Click]);
    assert_eq!(desk.calls, expected);
    assert_eq!(summary.success_count, 1);
    assert!(reporter.has(Level::Info, "slot 2 confirmed"));
}

#[test]
fn test_slot_choice_is_deterministic() {
    let slots = vec![
        slot(Coordinate::new(10, 10), Color::new(50, 50, 50)),
        slot(Coordinate::new(30, 10), ITEM),
        slot(Coordinate::new(50, 10), ITEM),
    ];
    let frames = vec![
        frame(&[(slots[1].coord, ITEM), (slots[2].coord, Color::new(103, 97, 100))]),
        frame(&[(BUTTON, LIT)]),
    ];

    let logs: Vec<Vec<Call>> = (0..2)
        .map(|_| {
            let (engine, _) = engine();
            let mut desk = FakeDesk::new(frames.clone());
            engine.run(&mut desk, &config(slots.clone()), cycles(1));
            desk.calls
        })
        .collect();

    assert_eq!(logs[0], logs[1]);
    assert_eq!(logs[0][1], Call::MoveTo(slots[1].coord));
}

#[test]
fn test_capture_failure_is_not_a_match() {
    let (engine, reporter) = engine();
    let mut desk = FakeDesk::new(vec![
        frame(&[(SLOT, ITEM), (BUTTON, DARK)]),
        frame(&[(BUTTON, LIT)]),
    ]);
    desk.failing_captures = 2;

    // The first two batches fail; capture #2 shows frame 1 where the slot is dark.
    let summary = engine.run(&mut desk, &config(vec![slot(SLOT, ITEM)]), cycles(3));

    assert_eq!(desk.calls, vec![Call::Capture; 3]);
    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert!(reporter.has(Level::Debug, "display asleep"));
}

#[test]
fn test_input_failure_ends_the_run() {
    let (engine, reporter) = engine();
    let mut desk = FakeDesk::new(vec![frame(&[(SLOT, ITEM), (BUTTON, LIT)])]);
    desk.fail_op = Some("press");

    let summary = engine.run(&mut desk, &config(vec![slot(SLOT, ITEM)]), || false);

    assert_eq!(desk.calls, vec![Call::Capture, Call::MoveTo(SLOT), Call::Press]);
    assert_eq!(
        summary.outcome,
        RunOutcome::ActionFailed(InputError::rejected("press", "device unplugged"))
    );
    assert!(summary.is_failure());
    assert!(!engine.is_running());
    assert!(reporter.has(Level::Error, "press failed"));
}

#[test]
fn test_counter_resets_between_runs() {
    let (engine, _) = engine();
    let cfg = config(vec![slot(SLOT, ITEM)]);

    let mut desk = FakeDesk::new(vec![frame(&[(SLOT, ITEM), (BUTTON, LIT)])]);
    assert_eq!(engine.run(&mut desk, &cfg, cycles(1)).success_count, 1);

    let mut idle = FakeDesk::new(vec![Frame::new()]);
    let summary = engine.run(&mut idle, &cfg, cycles(2));
    assert_eq!(idle.captures, 2);
    assert_eq!(summary.success_count, 0);
    assert_eq!(engine.success_count(), 0);
}

#[test]
fn test_stop_before_run_is_honored_once() {
    let (engine, _) = engine();
    let cfg = config(vec![slot(SLOT, ITEM)]);

    engine.stop();
    let mut desk = FakeDesk::new(vec![frame(&[(SLOT, ITEM), (BUTTON, LIT)])]);
    let summary = engine.run(&mut desk, &cfg, || false);
    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert!(desk.calls.is_empty());

    // The flag was consumed, so the next run cycles normally.
    let mut desk = FakeDesk::new(vec![frame(&[(SLOT, ITEM), (BUTTON, LIT)])]);
    assert_eq!(engine.run(&mut desk, &cfg, cycles(1)).success_count, 1);
}

#[test]
fn test_rejected_run_consumes_pending_stop() {
    let (engine, _) = engine();

    engine.stop();
    let mut desk = FakeDesk::new(vec![Frame::new()]);
    let rejected = engine.run(&mut desk, &config(Vec::new()), || false);
    assert_eq!(rejected.outcome, RunOutcome::Rejected(ConfigError::NoSlots));
    assert!(!engine.is_running());

    let mut desk = FakeDesk::new(vec![Frame::new()]);
    let summary = engine.run(&mut desk, &config(vec![slot(SLOT, ITEM)]), cycles(4));
    assert_eq!(desk.captures, 4);
    assert_eq!(summary.outcome, RunOutcome::Stopped);
}

#[test]
fn test_second_run_while_running_is_rejected() {
    let (engine, _) = engine();
    let engine = Arc::new(engine);
    let cfg = config(vec![slot(SLOT, ITEM)]);

    let worker = {
        let engine = Arc::clone(&engine);
        let cfg = cfg.clone();
        thread::spawn(move || {
            let mut desk = FakeDesk::new(vec![Frame::new()]);
            engine.run(&mut desk, &cfg, || false)
        })
    };
    let deadline = Instant::now() + Duration::from_secs(5);
    while !engine.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    let mut other = FakeDesk::new(vec![Frame::new()]);
    let rejected = engine.run(&mut other, &cfg, || false);
    engine.stop();
    worker.join().unwrap();

    assert_eq!(rejected.outcome, RunOutcome::Rejected(ConfigError::AlreadyRunning));
    assert!(other.calls.is_empty());
}

#[test]
fn test_stop_during_rejected_second_run_reaches_active_run() {
    let (engine, _) = engine();
    let engine = Arc::new(engine);
    let cfg = config(vec![slot(SLOT, ITEM)]);
    let (entered_tx, entered_rx) = mpsc::channel();
    let (go_tx, go_rx) = mpsc::channel::<()>();

    let worker = {
        let engine = Arc::clone(&engine);
        let cfg = cfg.clone();
        thread::spawn(move || {
            let mut desk = FakeDesk::new(vec![Frame::new()]);
            let mut first = true;
            // Park inside the first stop check until the main thread is done.
            let summary = engine.run(&mut desk, &cfg, move || {
                if std::mem::take(&mut first) {
                    entered_tx.send(()).ok();
                    go_rx.recv().ok();
                }
                false
            });
            (summary, desk.captures)
        })
    };
    entered_rx.recv().unwrap();

    engine.stop();
    let mut other = FakeDesk::new(vec![Frame::new()]);
    let rejected = engine.run(&mut other, &config(Vec::new()), || false);
    go_tx.send(()).unwrap();
    let (summary, captures) = worker.join().unwrap();

    assert_eq!(rejected.outcome, RunOutcome::Rejected(ConfigError::AlreadyRunning));
    assert_eq!(summary.outcome, RunOutcome::Stopped);
    assert_eq!(captures, 1);
    assert!(!engine.is_running());
}

#[test]
fn test_persistent_sample_failure_warns_once() {
    let (engine, reporter) = engine();
    // Off the edge of the captured area, on "another display".
    let far = Coordinate::new(500, 10);
    let mut desk = FakeDesk::new(vec![frame(&[(SLOT, ITEM), (far, ITEM)])]);
    desk.max_width = Some(300);

    let cycles_run = FAILURE_STREAK_WARN as usize * 2 + 5;
    let summary = engine.run(&mut desk, &config(vec![slot(SLOT, ITEM), slot(far, ITEM)]), cycles(cycles_run));

    assert_eq!(summary.success_count, 0);
    assert_eq!(desk.clicks(), 0);
    assert_eq!(reporter.count(Level::Warn, &format!("sample at {} failed", far)), 1);
    assert_eq!(reporter.count(Level::Warn, &format!("sample at {} failed", SLOT)), 0);
}

#[test]
fn test_debug_color_matching_reports_each_slot() {
    let (engine, reporter) = engine();
    let mut cfg = config(vec![slot(SLOT, ITEM), slot(Coordinate::new(30, 30), LIT)]);
    cfg.debug_color_matching = true;
    let mut desk = FakeDesk::new(vec![frame(&[(SLOT, Color::new(90, 100, 100))])]);

    engine.run(&mut desk, &cfg, cycles(1));

    assert!(reporter.has(Level::Debug, "slot 1: current=(90, 100, 100) target=(100, 100, 100)"));
    assert!(reporter.has(Level::Debug, "max=10 tolerance=5 match=false"));
    assert!(reporter.has(Level::Debug, "slot 2:"));
}
