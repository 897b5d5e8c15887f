//! Logging Infrastructure
//!
//! Structured logging setup for development (console) and production
//! (console + daily rotating files).

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the logging system.
///
/// # Arguments
/// * `level` - fallback filter when RUST_LOG is unset (e.g. "info", "debug")
/// * `json_format` - JSON output for production, pretty for development
/// * `log_dir` - optional directory for daily rotating `core-YYYY-MM-DD.log` files
///
/// Returns the appender guard when file logging is enabled; dropping it
/// flushes and stops the background writer.
pub fn init(level: &str, json_format: bool, log_dir: Option<&str>) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = if json_format {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "core.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(level, json_format, "Logging initialized");
    Ok(guard)
}
