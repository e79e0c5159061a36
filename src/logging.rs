//! Tracing subscriber setup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogConfig;

/// Install the global subscriber.
///
/// Stderr always gets compact human-readable output. When a log directory is
/// configured, a JSON layer is added that writes to a daily rolling file.
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn init(config: &LogConfig) -> Option<WorkerGuard> {
    let env_filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter());

    match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mentor-match.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_current_span(true)
                .with_filter(env_filter());

            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}
