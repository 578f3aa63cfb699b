//! Log subscriber setup

use tracing_subscriber::EnvFilter;

/// Install the global subscriber writing to stderr
///
/// Filtering follows `RUST_LOG`, defaulting to `info`. Calling this more
/// than once keeps the first subscriber.
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
