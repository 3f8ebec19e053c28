use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{mpsc, Mutex, OnceLock};

use chrono::Local;
use serde::{Deserialize, Serialize};

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
    min_level: Level,
    tui_tx: Option<mpsc::Sender<String>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in the dashboard)
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Initialize the global logger. Clears the log file.
/// Messages below `min_level` are dropped from every sink.
pub fn init(log_dir: &Path, min_level: Level) -> io::Result<()> {
    fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_dir.join("altar.log"))?;

    LOGGER
        .set(Mutex::new(Logger { file, min_level, tui_tx: None, prefixes: HashMap::new() }))
        .ok();
    Ok(())
}

fn with_logger(f: impl FnOnce(&mut Logger)) {
    if let Some(logger) = LOGGER.get() {
        let mut l = logger.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut l);
    }
}

/// Wire the TUI log channel.
pub fn set_tui_sender(tx: mpsc::Sender<String>) {
    with_logger(|l| l.tui_tx = Some(tx));
}

/// Drop the TUI channel, e.g. when leaving the dashboard.
pub fn clear_tui_sender() {
    with_logger(|l| l.tui_tx = None);
}

/// Register a prefix with a color. All subsequent prefixed log calls
/// use this color.
pub fn register_prefix(prefix: &str, color: u8) {
    with_logger(|l| {
        l.prefixes.insert(prefix.to_string(), color);
    });
}

pub fn enabled(level: Level) -> bool {
    LOGGER
        .get()
        .and_then(|l| l.lock().ok().map(|l| level >= l.min_level))
        .unwrap_or(false)
}

/// Format for TUI channel uses \x1f as field separator:
/// level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage
pub fn log(level: Level, prefix: &str, msg: &str) {
    with_logger(|l| {
        if level < l.min_level {
            return;
        }
        let ts = Local::now().format("%H:%M:%S%.3f").to_string();
        let color = l.prefixes.get(prefix).copied().unwrap_or(0);

        // File always gets plain text
        let file_line = if prefix.is_empty() {
            format!("[{}] [{}] {}", ts, level, msg)
        } else {
            format!("[{}] [{}] [{}] {}", ts, level, prefix, msg)
        };
        writeln!(l.file, "{}", file_line).ok();

        if let Some(tx) = &l.tui_tx {
            let tui_line = format!("{}\x1f{}\x1f{}\x1f{}\x1f{}", level, prefix, color, ts, msg);
            tx.send(tui_line).ok();
        }
    });
}

pub fn debug(msg: &str) {
    log(Level::Debug, "", msg);
}

pub fn info(msg: &str) {
    log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    log(Level::Error, "", msg);
}

pub fn debug_p(prefix: &str, msg: &str) {
    log(Level::Debug, prefix, msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    log(Level::Warn, prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    log(Level::Error, prefix, msg);
}
