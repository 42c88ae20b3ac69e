//! Stderr tracing for the dispatcher binary.
//!
//! Replies go to stdout; everything here goes to stderr so piped replies
//! stay clean. `RUST_LOG` always wins over `--debug`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const QUIET_DIRECTIVE: &str = "warn";
const DEBUG_DIRECTIVE: &str = "warn,dispatcher=debug";

/// Filter directive used when `RUST_LOG` is unset or unparsable.
fn fallback_directive(debug: bool) -> &'static str {
    if debug { DEBUG_DIRECTIVE } else { QUIET_DIRECTIVE }
}

/// Install the global subscriber. Compact lines; targets shown under `--debug`.
///
/// ```bash
/// dispatcher --debug ask "/cook BUILD FAILED"
/// RUST_LOG=dispatcher::agent=trace dispatcher repl
/// ```
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback_directive(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(debug)
                .compact(),
        )
        .init();
}
