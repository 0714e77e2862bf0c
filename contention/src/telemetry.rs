use tracing_subscriber::EnvFilter;

/// Installs the stdout log subscriber used by the scenario binaries.
///
/// `RUST_LOG` overrides the default `info` level. Calling this twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}
