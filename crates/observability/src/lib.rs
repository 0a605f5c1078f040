//! Logging setup shared by the binaries.

/// Initialize process-wide logging with the format chosen by `LOG_FORMAT`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    logging::init(logging::LogFormat::from_env());
}

/// Subscriber configuration (filters, output format).
pub mod logging;
