//! Tracing subscriber setup for the binaries.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Install the global subscriber.
///
/// Plain text to stderr by default, JSON when `config.json` is set. When a
/// log directory is configured, output goes to a daily-rolling file
/// instead; keep the returned guard alive until exit so buffered lines
/// are flushed.
pub fn init(config: &LogConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("adotadog=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "adotadog.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let builder = builder.with_writer(writer).with_ansi(false);
            let result = if config.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            // Already initialised (e.g. tests calling twice) is not fatal
            result.ok();
            Some(guard)
        }
        None => {
            let builder = builder.with_writer(std::io::stderr);
            let result = if config.json {
                builder.json().try_init()
            } else {
                builder.try_init()
            };
            result.ok();
            None
        }
    }
}
