//! Diagnostic side channel for the zlq workspace.
//!
//! All progress reporting, per-file warnings, and timing summaries go
//! through these macros to stderr, never to stdout: stdout carries only
//! the query result stream.
//!
//! Level selection via ZLQ_LOG:
//! - off   - silent
//! - info  - file counts, view registration, timings (default)
//! - debug - per-file scan detail, generated SQL

use std::sync::Once;

// Re-export emit so the macros can expand in dependent crates
pub use emit;

static INIT: Once = Once::new();

/// Initialize the diagnostic channel from the ZLQ_LOG environment variable.
///
/// Safe to call more than once; only the first call takes effect.
pub fn init_diagnostics() {
    INIT.call_once(|| {
        let log_level = std::env::var("ZLQ_LOG").unwrap_or_else(|_| "info".to_string());

        let rt = match log_level.as_str() {
            "off" => return,
            "debug" => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Debug))
                .init(),
            "warn" => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Warn))
                .init(),
            "error" => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Error))
                .init(),
            _ => emit::setup()
                .emit_to(emit_term::stderr())
                .emit_when(emit::level::min_filter(emit::Level::Info))
                .init(),
        };

        // The runtime must live for the whole process
        std::mem::forget(rt);
    });
}

/// Operator-facing progress: file counts, view creation, row totals.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Per-file and per-statement detail useful when debugging a bad log set.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Recoverable conditions: unreadable files, missing headers, degraded casts.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Failures that end the run, reported before exiting.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
