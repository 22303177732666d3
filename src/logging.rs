use chrono::Local;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;

/// Wall-clock timestamps in local time, milliseconds included
struct LocalClock;

impl FormatTime for LocalClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%H:%M:%S.%3f"))
    }
}

/// Initialize tracing on stderr.
///
/// `RUST_LOG` takes precedence; `default_level` applies when it is unset or
/// unparsable. Returns false when a global subscriber was already installed,
/// which makes repeated calls harmless.
pub fn init_tracing(default_level: &str) -> bool {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_timer(LocalClock)
        .compact();

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(target: "system", "Tracing initialized at {}", default_level);
    }
    installed
}
