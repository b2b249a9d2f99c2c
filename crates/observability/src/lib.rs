//! Process-wide tracing setup for harvest workers and tests.

/// Initialize tracing with the format chosen by `HARVEST_LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Subscriber construction (filters, output format).
pub mod tracing;
