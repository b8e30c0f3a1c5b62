use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::{config::LoggingConfig, InitializationError, ServiceError};

const LOG_FILE_PREFIX: &str = "rotation-probe.log";

/// Install the global subscriber.
///
/// The returned guard flushes the file writer and must live as long as the process.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, ServiceError> {
    // Validate logging config before proceeding
    config.validate()?;

    let timer = OffsetTime::new(
        UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
        time::format_description::well_known::Rfc3339,
    );

    let env_filter = EnvFilter::default().add_directive(config.get_level_filter().into());

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(config.thread_ids)
        .with_thread_names(config.thread_names)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_level(true)
        .with_timer(timer.clone());

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if config.is_json() {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.boxed());
    }

    let guard = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let file = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_timer(timer)
                .with_writer(writer);

            if config.is_json() {
                layers.push(file.json().boxed());
            } else {
                layers.push(file.boxed());
            }

            Some(guard)
        }
        None => None,
    };

    Registry::default()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| {
            InitializationError::logging(format!("Failed to initialize logging: {}", e))
        })?;

    Ok(guard)
}
