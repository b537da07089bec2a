//! Logging helpers
//!
//! `RUST_LOG` takes precedence over the level passed in from configuration.

/// Initialize the global logger
///
/// # Parameters
///
/// * `level` - Default log level when `RUST_LOG` is unset
pub fn init_logger(level: &str) {
    let env = env_logger::Env::default()
        .filter_or("RUST_LOG", level);

    // A second initialisation (tests, embedding applications) is not an error.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init();
}
