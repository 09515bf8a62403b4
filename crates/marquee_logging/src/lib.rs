#![deny(missing_docs)]
//! Shared logging utilities for the marquee workspace.
//!
//! This crate provides the `mq_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. The macros expand
//! through a re-export of `log`, so callers do not need their own `log`
//! dependency.

#[doc(hidden)]
pub use log as __log;

/// Log target used by the fetch controllers.
pub const TARGET_CONTROLLER: &str = "marquee::controller";

/// Log target used by the HTTP page-fetcher.
pub const TARGET_API: &str = "marquee::api";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! mq_trace {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::__log::trace!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! mq_debug {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::__log::debug!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! mq_info {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::__log::info!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! mq_warn {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::__log::warn!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! mq_error {
    (target: $target:expr, $($arg:tt)*) => {{
        $crate::__log::error!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        $crate::__log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
