//! Tracing setup for the deckhand binary.
//!
//! Log lines go to stderr; stdout is reserved for command output (records,
//! dispatch results, session reports).

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives read before `RUST_LOG`.
pub const ENV_LOG: &str = "DECKHAND_LOG";

/// HTTP internals stay at `warn` unless a directive says otherwise.
fn default_directives(level: Level) -> String {
    format!("{level},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn")
}

fn build_filter(level: Level) -> EnvFilter {
    [ENV_LOG, EnvFilter::DEFAULT_ENV]
        .iter()
        .find_map(|var| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .and_then(|v| EnvFilter::try_new(v).ok())
        })
        .unwrap_or_else(|| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber. `json` switches to newline-delimited JSON.
///
/// Later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(build_filter(level));

    if json {
        registry.with(layer.json()).try_init().ok();
    } else {
        registry.with(layer).try_init().ok();
    }
}
