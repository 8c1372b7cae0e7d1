//! Process-wide verbose flag
//!
//! Diagnostic lines go through the `log` facade at info level, target
//! `dpapibox`, and only while the flag is set. The library never installs a
//! logger; the embedding application picks one.
//!
//! The flag is meant to be set once at startup via [`crate::initialize`].
//! Flipping it while other threads are mid-operation is not supported: those
//! operations may emit a partial trace.

use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Emit a diagnostic line when verbose logging is enabled.
macro_rules! verbose {
    ($($arg:tt)+) => {
        if $crate::logging::is_verbose() {
            ::log::info!(target: "dpapibox", $($arg)+);
        }
    };
}

pub(crate) use verbose;
