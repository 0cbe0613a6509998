use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::eyre;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

#[cfg(debug_assertions)]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

#[cfg(not(debug_assertions))]
const DEFAULT_LEVEL: LevelFilter = LevelFilter::WARN;

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(DEFAULT_LEVEL.into())
        .from_env_lossy()
}

/// Install the global subscriber: console (stderr) and, with `log_file`, a
/// non-blocking file layer. `RUST_LOG` overrides the default level.
///
/// The returned guard must be kept alive until exit so buffered file output
/// is flushed.
pub fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // stdout carries the JSON result.
    let console_layer = fmt::Layer::default()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| eyre!("log file path {} has no file name", path.display()))?;
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::Layer::default()
                .with_target(false)
                .with_ansi(false)
                .with_writer(non_blocking)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;
    Ok(guard)
}
