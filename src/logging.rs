//! Diagnostic logging setup.
//!
//! Logs go to stderr so they never interleave with the streamed reply on
//! stdout. `RUST_LOG` wins when set; otherwise only warnings are shown, or
//! this crate's debug output with `--debug`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init(debug: bool) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ if debug => EnvFilter::new(format!("{}=debug", crate::constants::APP_NAME)),
        _ => EnvFilter::new("warn"),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
