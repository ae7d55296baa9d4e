use std::io::{self, IsTerminal};
use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr so stdout only ever carries cluster output.
///
/// `RUST_LOG` takes precedence over `--debug`.
pub fn init(debug: bool) {
    let default = if debug { "escat=debug" } else { "escat=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init();
}
