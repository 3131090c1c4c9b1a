//! Tracing bootstrap for binaries and integration tests.
//!
//! Library crates only emit events; installing a subscriber is the
//! entrypoint's job. `init` is idempotent so parallel tests can all call
//! it.

use std::io::{self, IsTerminal};
use std::sync::Once;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, fmt};

/// Compact RFC3339 UTC timestamps, e.g. `2026-08-01T10:20:30Z`.
#[derive(Clone, Debug, Default)]
struct Rfc3339Utc;

impl FormatTime for Rfc3339Utc {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = chrono::Utc::now();
        w.write_str(&now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Installs the global subscriber once. Filtering follows `RUST_LOG`,
/// defaulting to `info`; ANSI colors only when stdout is a terminal.
pub fn init() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_timer(Rfc3339Utc)
            .with_target(true)
            .with_ansi(io::stdout().is_terminal())
            .compact()
            .init();
    });
}
