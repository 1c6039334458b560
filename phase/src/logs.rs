//! Logging to the javascript console.
//!
//! Errors reported by a phase controller without its own `on_error` handler
//! are logged at error level and land here.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, prelude::*};
use tracing_web::MakeWebConsoleWriter;

pub const DEFAULT_DIRECTIVES: &str = "error,phase=debug";

/// Install the console subscriber with the given filter directives.
///
/// Fails if a global subscriber is already set, e.g. when an app mounts
/// twice.
pub fn try_init_logging(directives: &str) -> Result<(), TryInitError> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_ansi(false) // Only partially supported across browsers
        .without_time() // std::time is not available in browsers
        .with_writer(MakeWebConsoleWriter::new().with_pretty_level())
        .with_level(false);

    tracing_subscriber::registry()
        .with(EnvFilter::new(directives))
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(directives, "Initialized logs");
    Ok(())
}

/// Initialize logging with [`DEFAULT_DIRECTIVES`]; a second call is a no-op.
pub fn init_logging() {
    if let Err(e) = try_init_logging(DEFAULT_DIRECTIVES) {
        tracing::debug!("logging already initialized: {e}");
    }
}
