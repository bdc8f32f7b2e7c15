//! Логирование на `tracing-subscriber`: фильтр `EnvFilter`, консольный слой
//! и необязательный файловый приёмник `tracing-appender` с ежедневной
//! ротацией.

pub mod config;
mod filters;
mod formatter;
pub mod handle;

pub use config::{FileLogConfig, LogFormat, LoggingConfig};
pub use handle::{LoggingHandle, LoggingStats};

use herald_error::{GenericError, StackError, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация логирования с конфигурацией.
///
/// Устанавливает глобальный subscriber; повторный вызов возвращает ошибку.
/// Возвращённый handle нужно держать до завершения программы, иначе
/// файловый приёмник потеряет буфер.
pub fn init_logging(config: LoggingConfig) -> Result<LoggingHandle, StackError> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(&config);
    let mut layers = Vec::new();

    // Console layer
    layers.push(formatter::build_layer(
        config.format,
        config.ansi,
        std::io::stdout,
    ));

    // File layer
    let file_guard = match &config.file {
        Some(file) => {
            let appender =
                tracing_appender::rolling::daily(&file.directory, &file.file_name_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(formatter::build_layer(file.format, false, writer));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|err| {
            StackError::new(GenericError::new(
                StatusCode::Internal,
                format!("failed to install global subscriber: {err}"),
            ))
        })?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        file_enabled = file_guard.is_some(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
