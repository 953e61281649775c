use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that logs at INFO by default.
///
/// The level can be overridden with the `RUST_LOG` environment variable,
/// e.g. `RUST_LOG=braid_driver=debug` to see every callback.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_logger() {
    init_logger_with_level(Level::INFO);
}

/// Installs a `tracing` subscriber with a custom default level.
///
/// # Example
///
/// ```no_run
/// use braid_driver::init_logger_with_level;
/// use tracing::Level;
///
/// init_logger_with_level(Level::DEBUG);
/// tracing::debug!("callback logging enabled");
/// ```
pub fn init_logger_with_level(default_level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
