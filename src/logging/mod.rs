//! Logger handed to components instead of a process-wide logger
//!
//! The library never installs a global logger. Components hold an
//! `Arc<dyn Logger>`; the binary pairs [`LogFacade`] with `env_logger`, tests
//! and batch callers can pass [`Silent`] or their own recorder.

use log::Level;
use std::fmt;
use std::sync::Arc;

/// Sink for diagnostic messages emitted by predictors and energy components
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, args: fmt::Arguments<'_>);

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }
}

/// Forwards to the `log` facade under a fixed target
#[derive(Debug, Clone)]
pub struct LogFacade {
    target: &'static str,
}

impl LogFacade {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl Default for LogFacade {
    fn default() -> Self {
        Self::new("cliff")
    }
}

impl Logger for LogFacade {
    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        log::log!(target: self.target, level, "{}", args);
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Logger for Silent {
    fn log(&self, _level: Level, _args: fmt::Arguments<'_>) {}
}

/// Default logger for a component
pub fn facade(target: &'static str) -> Arc<dyn Logger> {
    Arc::new(LogFacade::new(target))
}


#[cfg(test)]
mod tests {
    use super::testing::Recorder;
    use super::*;

    #[test]
    fn test_helpers_set_levels() {
        let recorder = Recorder::default();
        recorder.info(format_args!("kernel uses {} GB", 0.5));
        recorder.warn(format_args!("large"));
        recorder.debug(format_args!("detail"));

        assert_eq!(recorder.messages(Level::Info), vec!["kernel uses 0.5 GB"]);
        assert_eq!(recorder.messages(Level::Warn), vec!["large"]);
        assert_eq!(recorder.messages(Level::Debug), vec!["detail"]);
    }

    #[test]
    fn test_facade_and_silent_do_not_panic_without_logger() {
        let facade = LogFacade::default();
        assert_eq!(facade.target(), "cliff");
        facade.info(format_args!("no global logger installed"));
        Silent.warn(format_args!("dropped"));
    }
}
