use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. `RUST_LOG` overrides the `info` default;
/// `SLIPSCAN_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("SLIPSCAN_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

    let registry = tracing_subscriber::registry().with(filter);
    // Logs go to stderr so `extract`/`normalize` output stays pipeable.
    if json {
        registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}
