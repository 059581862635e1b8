/*!
Logging integration for the view-stripes binary.

Logs go to stderr so the WKT on stdout stays machine readable. With the
`profiling` feature the library's profiling scopes become tracing spans and
their timings are logged when they close.
*/

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Initialize logging, defaulting `RUST_LOG` when it is not set
pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_err() {
        // Safety: single-threaded at startup
        unsafe {
            if cfg!(debug_assertions) {
                std::env::set_var("RUST_LOG", "info,view_stripes_lib=debug");
            } else {
                std::env::set_var("RUST_LOG", "info");
            }
        }
    }

    let fmt_layer = fmt::layer().with_writer(std::io::stderr);
    #[cfg(feature = "profiling")]
    let fmt_layer = fmt_layer.with_span_events(fmt::format::FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(EnvFilter::from_default_env()))
        .init();

    if cfg!(feature = "profiling") {
        tracing::info!("Logging initialized with profiling spans");
    } else {
        tracing::debug!("Logging initialized (profiling disabled in this build)");
    }
}
