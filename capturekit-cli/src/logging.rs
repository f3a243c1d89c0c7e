//! Tracing setup for the binary

use tracing_subscriber::EnvFilter;

const DEBUG_FILTER: &str =
    "capturekit=debug,capturekit_cli=debug,capturekit_engine=debug,capturekit_config=debug";

/// Log to stderr without colors: debug for the capturekit crates with
/// `debug`, info with `verbose`, otherwise `RUST_LOG` or warnings only.
/// A second call is a no-op.
pub fn init_tracing(debug: bool, verbose: bool) {
    let filter = if debug {
        EnvFilter::new(DEBUG_FILTER)
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}
