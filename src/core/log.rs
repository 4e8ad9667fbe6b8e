//! Tracing subscriber setup shared by every command.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber. `level` applies to this crate and to
/// actix request logs; `RUST_LOG` still narrows or widens everything else.
pub fn init_logging(level: LevelFilter) {
    let app_filter = Targets::new()
        .with_target("nsedash", level)
        .with_target("actix_web", level);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(app_filter)
        .with(env_filter)
        .init();
}

/// Servers log at info; the other commands stay quiet unless verbose.
pub fn default_level(verbose: bool, serving: bool) -> LevelFilter {
    match (verbose, serving) {
        (true, _) => LevelFilter::DEBUG,
        (false, true) => LevelFilter::INFO,
        (false, false) => LevelFilter::OFF,
    }
}
