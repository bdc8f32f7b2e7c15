use std::{fs, path::PathBuf};

use herald_error::{GenericError, StackError, StatusCode};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Формат строк лога.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Настройки файлового приёмника с ежедневной ротацией.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLogConfig {
    pub directory: PathBuf,
    /// Префикс имени файла; к нему добавляется дата.
    pub file_name_prefix: String,
    pub format: LogFormat,
}

impl Default for FileLogConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_name_prefix: "herald.log".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Настройки логирования.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Директива `EnvFilter`, например `"info"` или `"herald=debug,warn"`.
    /// `RUST_LOG`, если задана, имеет приоритет.
    pub level: String,
    pub format: LogFormat,
    /// ANSI-цвета в консоли.
    pub ansi: bool,
    /// Файловый приёмник; `None` — только консоль.
    pub file: Option<FileLogConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            ansi: true,
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn build_filter_directive(&self) -> &str {
        self.level.trim()
    }

    pub fn validate(&self) -> Result<(), StackError> {
        if let Err(err) = EnvFilter::try_new(self.build_filter_directive()) {
            return Err(StackError::new(GenericError::new(
                StatusCode::InvalidConfig,
                format!("invalid logging.level directive '{}': {err}", self.level),
            )));
        }
        if let Some(file) = &self.file {
            if file.file_name_prefix.trim().is_empty() {
                return Err(StackError::new(GenericError::new(
                    StatusCode::InvalidConfig,
                    "logging.file.file_name_prefix must not be empty",
                )));
            }
        }
        Ok(())
    }

    /// Создаёт каталог файлового приёмника, если он настроен.
    pub fn ensure_log_dir(&self) -> Result<(), StackError> {
        if let Some(file) = &self.file {
            fs::create_dir_all(&file.directory)?;
        }
        Ok(())
    }
}
