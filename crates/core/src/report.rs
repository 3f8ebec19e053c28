use crate::logger::{self, Level};

/// Narrow sink for engine progress messages.
pub trait Reporter: Send + Sync {
    fn report(&self, level: Level, msg: &str);

    /// Whether `level` would be kept. Lets callers skip building
    /// expensive messages.
    fn enabled(&self, _level: Level) -> bool {
        true
    }
}

/// Forwards to the global logger under a fixed prefix.
pub struct LogReporter {
    prefix: &'static str,
}

impl LogReporter {
    pub fn new(prefix: &'static str) -> Self {
        logger::register_prefix(prefix, logger::COLOR_GREEN);
        Self { prefix }
    }
}

impl Reporter for LogReporter {
    fn report(&self, level: Level, msg: &str) {
        logger::log(level, self.prefix, msg);
    }

    fn enabled(&self, level: Level) -> bool {
        logger::enabled(level)
    }
}
