//! Tracing initialisation for the `vend` binary.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` is the default filter.
/// With `json` every line is a JSON object. Logs go to stderr so that
/// command output on stdout stays parseable. Only the first call has an
/// effect.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}
