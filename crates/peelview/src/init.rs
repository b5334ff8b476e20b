//! Process-wide setup.

/// Installs the `env_logger` backend for the `log` macros.
///
/// Honors `RUST_LOG`. Calling it more than once is harmless; later calls are
/// ignored.
pub fn init_logging() {
    let _ = env_logger::try_init();
    log::debug!("peelview {} logging initialized", env!("CARGO_PKG_VERSION"));
}
