use std::fmt;

use num_enum::TryFromPrimitive;

/// Коды статуса для категоризации ошибок мессенджера.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Регистрация получателей
/// - 3xxx: Протокол запрос/ответ
/// - 4xxx: Доставка сообщений и потоки
///
/// `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unexpected = 1001,
    Internal = 1002,
    InvalidArgs = 1003,
    InvalidConfig = 1004,
    Io = 1005,

    // === 2xxx: Регистрация ===
    NotFound = 2000,
    AlreadyExists = 2001,
    RecipientDropped = 2002,

    // === 3xxx: Запрос/ответ ===
    NoReply = 3000,
    AlreadyReplied = 3001,

    // === 4xxx: Доставка ===
    HandlerFailed = 4000,
    StreamClosed = 4001,
    StreamLagged = 4002,
    StreamEmpty = 4003,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Ошибка вызывающей стороны: нарушен контракт API (дубликат
    /// регистрации, повторный ответ, чтение ответа до его появления).
    ///
    /// Все коды `2xxx..3xxx` и `InvalidArgs`.
    pub fn is_client_error(&self) -> bool {
        let c = self.code();
        if (2000..=3999).contains(&c) {
            return true;
        }
        matches!(self, Self::InvalidArgs | Self::InvalidConfig)
    }

    /// Внутренняя ошибка (диапазон `1xxx`, кроме ошибок аргументов).
    pub fn is_internal_error(&self) -> bool {
        matches!(self, Self::Unknown | Self::Unexpected | Self::Internal | Self::Io)
    }

    /// Ошибка, возникшая во время доставки (диапазон `4xxx`).
    pub fn is_dispatch_error(&self) -> bool {
        (4000..=4999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::NotFound | Self::AlreadyExists | Self::StreamEmpty => LogLevel::Debug,
            Self::InvalidArgs
            | Self::InvalidConfig
            | Self::RecipientDropped
            | Self::NoReply
            | Self::AlreadyReplied => LogLevel::Info,
            Self::HandlerFailed | Self::StreamClosed | Self::StreamLagged => LogLevel::Warn,
            Self::Unknown | Self::Unexpected | Self::Internal | Self::Io => LogLevel::Error,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
