//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Safe to call more than once; repeated initialization is ignored so
/// tests and embedding applications can both call it.
pub fn init() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
