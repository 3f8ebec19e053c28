use std::collections::VecDeque;
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use altar_core::engine::{Engine, EngineStatus, RunConfig, RunSummary, StopSignal};
use altar_core::error::ConfigError;
use altar_core::logger;
use altar_core::platform::create_platform;

use crate::confirm::ConfirmDialog;

/// Lines kept for the log panel; older ones are dropped.
const LOG_CAPACITY: usize = 5000;

pub struct App {
    pub engine: Arc<Engine>,
    pub config: Result<RunConfig, ConfigError>,
    pub force_stub: bool,
    /// Raised by the global hotkey; polled by the engine as its stop predicate.
    pub hotkey: StopSignal,
    pub worker: Option<JoinHandle<anyhow::Result<RunSummary>>>,
    pub last_summary: Option<RunSummary>,
    pub log_visible: bool,
    pub log_messages: VecDeque<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        engine: Arc<Engine>,
        config: Result<RunConfig, ConfigError>,
        force_stub: bool,
        hotkey: StopSignal,
        log_rx: mpsc::Receiver<String>,
    ) -> Self {
        Self {
            engine,
            config,
            force_stub,
            hotkey,
            worker: None,
            last_summary: None,
            log_visible: true,
            log_messages: VecDeque::with_capacity(LOG_CAPACITY),
            log_scroll: 0,
            log_rx,
            confirm: None,
            should_quit: false,
        }
    }

    pub fn status(&self) -> EngineStatus {
        self.engine.status()
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            if self.log_messages.len() == LOG_CAPACITY {
                self.log_messages.pop_front();
            }
            self.log_messages.push_back(msg);
            // Keep the view pinned to the same lines while scrolled back
            if self.log_scroll > 0 {
                self.log_scroll = (self.log_scroll + 1).min(LOG_CAPACITY - 1);
            }
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    /// Collect the worker's summary once its loop has exited.
    pub fn poll_worker(&mut self) {
        if !self.worker.as_ref().is_some_and(|w| w.is_finished()) {
            return;
        }
        if let Some(worker) = self.worker.take() {
            self.finish(worker);
        }
    }

    fn finish(&mut self, worker: JoinHandle<anyhow::Result<RunSummary>>) {
        match worker.join() {
            Ok(Ok(summary)) => self.last_summary = Some(summary),
            Ok(Err(e)) => logger::error(&format!("could not start: {:#}", e)),
            Err(_) => logger::error("engine thread panicked"),
        }
    }

    pub fn start_stop(&mut self) {
        if self.is_running() {
            logger::info("stopping after the current cycle...");
            self.engine.stop();
            return;
        }
        let config = match &self.config {
            Ok(c) => c.clone(),
            Err(e) => {
                logger::warn(&format!("cannot start: {}", e));
                return;
            }
        };

        self.hotkey.reset();
        let engine = Arc::clone(&self.engine);
        let hotkey = self.hotkey.clone();
        let force_stub = self.force_stub;
        self.worker = Some(thread::spawn(move || {
            let mut platform = create_platform(force_stub)?;
            logger::info(&format!("running on the {} platform", platform.name()));
            Ok(engine.run(platform.as_mut(), &config, move || hotkey.is_set()))
        }));
    }

    pub fn request_quit(&mut self) {
        if self.is_running() {
            self.confirm = Some(ConfirmDialog::new("Stop automation and quit?"));
        } else {
            self.should_quit = true;
        }
    }

    /// Answer the open dialog. Accepting stops the engine and waits for the
    /// in-flight cycle to finish.
    pub fn resolve_confirm(&mut self, accept: bool) {
        if self.confirm.take().is_none() || !accept {
            return;
        }
        self.engine.stop();
        if let Some(worker) = self.worker.take() {
            self.finish(worker);
        }
        self.should_quit = true;
    }
}
