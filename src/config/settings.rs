use config::{Config, ConfigError, Environment};
use herald_error::{ensure, GenericError, StackError, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::logging::LoggingConfig;

/// Префикс переменных окружения: `HERALD_MESSENGER__STREAM_CAPACITY=128`.
pub const ENV_PREFIX: &str = "HERALD";

/// Настройки мессенджера.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessengerConfig {
    /// Сколько мёртвых получателей должна встретить рассылка, прежде чем
    /// реестр будет очищен автоматически. `0` отключает автоочистку.
    pub auto_cleanup_threshold: usize,
    /// Ёмкость буфера `broadcast`-канала для `observe`.
    pub stream_capacity: usize,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            auto_cleanup_threshold: 0,
            stream_capacity: 64,
        }
    }
}

impl MessengerConfig {
    /// Секция `messenger` из [`Settings::load`].
    pub fn load() -> Result<Self, StackError> {
        Settings::load().map(|settings| settings.messenger)
    }

    /// Как [`load`](Self::load), но при ошибке пишет предупреждение и
    /// возвращает значения по умолчанию.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "Invalid messenger configuration, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), StackError> {
        ensure!(
            self.stream_capacity > 0,
            StatusCode::InvalidConfig,
            "messenger.stream_capacity must be greater than zero"
        );
        Ok(())
    }
}

/// Все настройки приложения.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub messenger: MessengerConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Значения по умолчанию, переопределённые переменными окружения с
    /// префиксом `HERALD_` (вложенность через `__`).
    pub fn load() -> Result<Self, StackError> {
        Self::load_from(Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_from(env: Environment) -> Result<Self, StackError> {
        let defaults = Settings::default();
        let cfg = Config::builder()
            // Добавляем значения по умолчанию
            .set_default("logging.level", defaults.logging.level.as_str())
            .map_err(invalid_config)?
            // Переменные окружения с префиксом HERALD_
            .add_source(env)
            .build()
            .map_err(invalid_config)?;

        let settings: Settings = cfg.try_deserialize().map_err(invalid_config)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), StackError> {
        self.messenger.validate()?;
        self.logging.validate()
    }
}

fn invalid_config(err: ConfigError) -> StackError {
    StackError::new(GenericError::new(StatusCode::InvalidConfig, err.to_string()))
}
