use tracing_subscriber::EnvFilter;

/// Initializes logging for the process.
///
/// Logs go to stderr so stdout stays a clean report stream. The filter is
/// read from `RUST_LOG` and defaults to `info`. Calling this more than once
/// is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
