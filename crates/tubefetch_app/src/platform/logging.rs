//! Diagnostic logging setup for the tubefetch binary.
//!
//! Diagnostics go to `./tubefetch.log` unless configured otherwise. User-facing
//! progress lines are printed by the renderer, not through the logger.

use std::path::Path;

use engine_logging::{LogDestination, DEFAULT_LOG_FILE};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Log destination as written in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogTarget {
    #[default]
    File,
    Terminal,
    Both,
    Off,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
            LogTarget::Off => LogDestination::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub target: LogTarget,
    pub level: LevelFilter,
}

impl LogSettings {
    /// `-v` raises the level and mirrors diagnostics to the terminal.
    pub fn with_verbosity(self, verbose: u8) -> Self {
        let level = match verbose {
            0 => self.level,
            1 => self.level.max(LevelFilter::Debug),
            _ => LevelFilter::Trace,
        };
        let target = match (verbose, self.target) {
            (0, target) => target,
            (_, LogTarget::File) => LogTarget::Both,
            (_, LogTarget::Off) => LogTarget::Terminal,
            (_, target) => target,
        };
        Self { target, level }
    }
}

pub fn initialize(settings: &LogSettings) {
    engine_logging::initialize(
        settings.target.into(),
        settings.level,
        Path::new(DEFAULT_LOG_FILE),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_mirrors_file_logging_to_terminal() {
        let base = LogSettings {
            target: LogTarget::File,
            level: LevelFilter::Info,
        };

        assert_eq!(base.with_verbosity(0), base);
        assert_eq!(
            base.with_verbosity(1),
            LogSettings {
                target: LogTarget::Both,
                level: LevelFilter::Debug,
            }
        );
        assert_eq!(base.with_verbosity(3).level, LevelFilter::Trace);
    }

    #[test]
    fn verbosity_never_lowers_the_configured_level() {
        let base = LogSettings {
            target: LogTarget::Terminal,
            level: LevelFilter::Trace,
        };
        assert_eq!(base.with_verbosity(1).level, LevelFilter::Trace);
    }
}
