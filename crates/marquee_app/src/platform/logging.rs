//! Logger setup for the terminal front end.
//!
//! Stdout carries rendered lists and command replies, so the default
//! destination is `./marquee.log`. Terminal logging writes to stderr.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./marquee.log";

/// Where log records go, chosen by the `log` field of `marquee.ron`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogDestination {
    /// `./marquee.log`, truncated at startup.
    File,
    /// Stderr, interleaved with the command loop.
    Terminal,
    Both,
    Off,
}

/// Installs the global logger. `verbose` adds controller and API debug
/// records such as page loads and discarded stale responses.
pub fn initialize(destination: LogDestination, verbose: bool) {
    let level = level_filter(verbose);
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        if let Some(file_logger) = create_file_logger(level, config) {
            loggers.push(file_logger);
        }
    }
    if loggers.is_empty() {
        return;
    }

    let _ = CombinedLogger::init(loggers);
}

fn level_filter(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verbose_enables_debug_records() {
        assert_eq!(level_filter(false), LevelFilter::Info);
        assert_eq!(level_filter(true), LevelFilter::Debug);
    }

    #[test]
    fn destination_is_read_from_config_text() {
        let parsed: LogDestination = ron::from_str("Both").unwrap();
        assert_eq!(parsed, LogDestination::Both);
        assert_eq!(ron::to_string(&LogDestination::Off).unwrap(), "Off");
    }
}
