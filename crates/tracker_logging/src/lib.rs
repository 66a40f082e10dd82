#![deny(missing_docs)]
//! Shared logging utilities for the cooking tracker workspace.
//!
//! Library crates log through the `tracker_*` macros below. Every line is
//! prefixed with the poll cycle the current thread is running, so the output
//! of one reconciliation pass can be read as a unit.

use std::cell::Cell;

#[doc(hidden)]
pub use log as __log;

thread_local! {
    /// Number of the poll cycle currently running on this thread.
    static POLL_CYCLE: Cell<u64> = const { Cell::new(0) };
}

/// Records the poll cycle number for the current thread.
/// The tracker calls this at the start of every cycle.
pub fn set_poll_cycle(cycle: u64) {
    POLL_CYCLE.with(|v| v.set(cycle));
}

/// Returns the poll cycle number for the current thread.
/// Returns 0 before the first cycle has started.
pub fn poll_cycle() -> u64 {
    POLL_CYCLE.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! tracker_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! tracker_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! tracker_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! tracker_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current poll cycle.
#[macro_export]
macro_rules! tracker_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!("[cycle {}] {}", $crate::poll_cycle(), format_args!($($arg)*));
    }};
}

/// Initializes a terminal logger for integration tests.
///
/// Safe to call from every test: a second initialization is ignored.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // wiremock and hyper are chatty at debug level.
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("wiremock")
        .build();

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_cycle_is_thread_local() {
        set_poll_cycle(7);
        assert_eq!(poll_cycle(), 7);
        let other = std::thread::spawn(poll_cycle).join().unwrap();
        assert_eq!(other, 0);
    }
}
