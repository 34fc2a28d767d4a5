//! Tracing initialisation for the `a2a-mesh` binary.
//!
//! Call [`init_tracing`] once at start-up. Later calls are ignored because the
//! global subscriber can only be set once per process.

use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "a2a-mesh.log";

/// Build the filter: `RUST_LOG` when set, otherwise `debug` for `verbose`,
/// otherwise the configured level.
pub fn env_filter(cfg: &LoggingConfig, verbose: bool) -> EnvFilter {
    let level = if verbose { "debug" } else { cfg.level.as_str() };
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Console output is plain or newline-delimited JSON. When
/// `cfg.directory` is set, JSON lines also go to a daily rolling file; keep
/// the returned guard alive until exit so buffered lines are flushed.
pub fn init_tracing(cfg: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &cfg.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false).json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter(cfg, verbose))
        .with(file_layer);

    if cfg.json {
        registry
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        registry.with(fmt::layer().with_target(false)).try_init().ok();
    }

    guard
}
