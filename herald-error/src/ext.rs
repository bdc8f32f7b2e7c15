use std::{any::Any, error::Error};

use crate::StatusCode;

/// Расширение для ошибок мессенджера (object-safe).
///
/// Предоставляет вспомогательные методы:
/// - извлечение статус-кода,
/// - детализированное сообщение для логов,
/// - теги для метрик.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Статус ошибки. По умолчанию [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`](std::any::Any) для downcast к
    /// конкретному типу.
    fn as_any(&self) -> &dyn Any;

    /// Детализированное сообщение для логов (Debug-представление).
    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    /// Набор тегов для систем наблюдаемости.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ]
    }

    /// Короткое имя типа ошибки (без пути модулей).
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Обёртка для хранения любых ошибок, реализующих `ErrorExt`.
///
/// Используется, когда обработчику нужно вернуть ошибку чужого крейта,
/// для которой нет собственной реализации `ErrorExt`.
pub struct BoxedError {
    inner: Box<dyn Error + Send + Sync + 'static>,
    code: StatusCode,
}

impl BoxedError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        Self::with_code(StatusCode::HandlerFailed, err)
    }

    pub fn with_code<E>(
        code: StatusCode,
        err: E,
    ) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        Self {
            inner: err.into(),
            code,
        }
    }

    pub fn into_inner(self) -> Box<dyn Error + Send + Sync + 'static> {
        self.inner
    }
}

impl std::fmt::Debug for BoxedError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{:?}", self.inner)
    }
}

impl std::fmt::Display for BoxedError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for BoxedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl ErrorExt for BoxedError {
    fn status_code(&self) -> StatusCode {
        self.code
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
