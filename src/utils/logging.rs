use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Maps a configured level name to a tracing level. Unknown names fall back
/// to `INFO`.
pub fn parse_level(name: &str) -> tracing::Level {
    match name.to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}

/// Initialize tracing/logging for the application.
///
/// `RUST_LOG` takes precedence over `default_level` when set. With `json`
/// enabled each event is written as one JSON object per line.
pub fn init(default_level: &str, json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(parse_level(default_level)).into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    // try_init so tests and repeated calls don't panic
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
