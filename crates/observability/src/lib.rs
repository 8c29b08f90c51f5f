//! Tracing/logging setup shared by processes embedding the job bridge.

/// Initialize process-wide tracing (JSON logs, `RUST_LOG` filter, default
/// `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Like [`init`], with a different default directive when `RUST_LOG` is
/// unset.
pub fn init_with_default(directive: &str) {
    tracing::init(directive);
}

/// Initialize human-readable logs routed through the test harness's output
/// capture.
pub fn init_for_tests() {
    tracing::init_test();
}

/// Tracing configuration (filters, layers).
pub mod tracing;
