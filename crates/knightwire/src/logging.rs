//! Tracing subscriber setup.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose spans and events are shown at the default level.
const CRATES: &[&str] = &[
    "knightwire",
    "knightwire_transport",
    "knightwire_protocol",
    "knightwire_session",
    "knightwire_room",
];

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG`, the Knightwire crates and `binary_name` log at
/// `default_level` (e.g. `"info"`, `"debug"`) and everything else is
/// silent.
///
/// # Errors
/// Fails if a global subscriber is already installed.
///
/// ```no_run
/// knightwire::logging::init("chess_server", "info").expect("logging set up once");
/// ```
pub fn init(binary_name: &str, default_level: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(binary_name, default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

fn default_directives(binary_name: &str, default_level: &str) -> String {
    CRATES
        .iter()
        .copied()
        .chain(std::iter::once(binary_name))
        .map(|target| format!("{}={default_level}", target.replace('-', "_")))
        .collect::<Vec<_>>()
        .join(",")
}
